//! Service risk scoring
//!
//! A service's risk grows with the information it processes, its protection
//! grows with how hard it is to reach and to log into. Security is the
//! margin of protection over risk.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Information, Service};

/// Weights used by the score rollup, read from the `[scoring]` config table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Risk added by each information asset the service processes
    pub information: i64,
    /// Extra risk for information flagged as personal data
    pub personal_data: i64,
    /// Protection added when authentication requires a second factor
    pub second_factor: i64,
    /// Protection per access level
    pub access: BTreeMap<String, i64>,
    /// Protection per authentication method, matched case-insensitively
    pub authentication: BTreeMap<String, i64>,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        let access = [("public", 0), ("internal", 100), ("private", 200)];
        let authentication = [
            ("open", 0),
            ("2fa hardware key", 10),
            ("2fa application code", 8),
            ("webserver basic authorisation", 3),
            ("user and password", 5),
            ("ssl client certificate", 8),
            ("ldap", 8),
            ("oauth", 10),
            ("api key", 6),
            ("ssh keys", 8),
        ];
        Self {
            information: 10,
            personal_data: 20,
            second_factor: 5,
            access: access
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            authentication: authentication
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

impl ScoringWeights {
    fn lookup(table: &BTreeMap<String, i64>, key: &str) -> i64 {
        let key = key.trim().to_lowercase();
        table
            .iter()
            .find(|(name, _)| name.to_lowercase() == key)
            .map_or(0, |(_, weight)| *weight)
    }
}

/// Scores of a single service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ServiceScore {
    pub risk: i64,
    pub protection: i64,
    pub security: i64,
}

/// Compute the scores of a service
///
/// `informations` holds the resolved information assets; ids that didn't
/// resolve are already left out.
#[must_use]
pub fn score_service<'a>(
    service: &Service,
    informations: impl IntoIterator<Item = &'a Information>,
    weights: &ScoringWeights,
) -> ServiceScore {
    let risk = informations
        .into_iter()
        .map(|info| {
            weights.information
                + if info.personal_data {
                    weights.personal_data
                } else {
                    0
                }
        })
        .sum::<i64>();

    let mut protection = ScoringWeights::lookup(&weights.access, service.access.as_str());
    if let Some(auth) = &service.authentication {
        protection += ScoringWeights::lookup(&weights.authentication, &auth.method);
        if auth.second_factor {
            protection += weights.second_factor;
        }
    }

    ServiceScore {
        risk,
        protection,
        security: protection - risk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Access, Authentication};

    #[test]
    fn test_score_rollup() {
        let service = Service {
            access: Access::Internal,
            authentication: Some(Authentication {
                method: "LDAP".to_string(),
                second_factor: true,
            }),
            ..Service::default()
        };
        let infos = [
            Information {
                personal_data: true,
                responsible: None,
            },
            Information::default(),
        ];

        let score = score_service(&service, &infos, &ScoringWeights::default());

        assert_eq!(score.risk, 40);
        assert_eq!(score.protection, 113);
        assert_eq!(score.security, 73);
    }

    #[test]
    fn test_unknown_weights_count_as_zero() {
        let service = Service {
            authentication: Some(Authentication {
                method: "carrier pigeon".to_string(),
                second_factor: false,
            }),
            ..Service::default()
        };
        let score = score_service(&service, [], &ScoringWeights::default());
        assert_eq!(score, ServiceScore::default());
    }

    #[test]
    fn test_partial_weights_keep_defaults() {
        let weights: ScoringWeights =
            serde_json::from_str(r#"{"information": 1, "access": {"Public": 7}}"#).unwrap();
        assert_eq!(weights.information, 1);
        assert_eq!(ScoringWeights::lookup(&weights.access, "public"), 7);
        assert_eq!(weights.personal_data, 20);
    }
}
