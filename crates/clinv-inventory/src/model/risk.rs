//! Risk management entities maintained by the user

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::lenient;
use crate::kind::Kind;

/// A group of services, information assets and people
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Project {
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub aliases: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub responsible: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub services: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub informations: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub people: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_map")]
    pub links: BTreeMap<String, String>,
}

/// Network exposure of a service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Access {
    Public,
    Internal,
    Private,
    #[default]
    Tbd,
}

impl Access {
    /// Parse an access level; unrecognised values are `Tbd`
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "public" | "internet" => Access::Public,
            "internal" | "intranet" => Access::Internal,
            "private" | "airgap" => Access::Private,
            _ => Access::Tbd,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Internal => "internal",
            Access::Private => "private",
            Access::Tbd => "tbd",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Access {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Access::parse(&s),
            _ => Access::Tbd,
        })
    }
}

/// How users authenticate against a service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authentication {
    pub method: String,
    pub second_factor: bool,
}

fn authentication<'de, D>(deserializer: D) -> Result<Option<Authentication>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Raw {
        #[serde(default, deserialize_with = "lenient::opt_string")]
        method: Option<String>,
        #[serde(default, deserialize_with = "lenient::bool_or_false")]
        second_factor: bool,
    }

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(method) if method.trim().is_empty() || method == "tbd" => Ok(None),
        Value::String(method) => Ok(Some(Authentication {
            method,
            second_factor: false,
        })),
        value @ Value::Object(_) => {
            let raw: Raw = serde_json::from_value(value).map_err(D::Error::custom)?;
            Ok(raw.method.map(|method| Authentication {
                method,
                second_factor: raw.second_factor,
            }))
        }
        other => Err(D::Error::custom(format!(
            "expected an authentication mapping, got {other}"
        ))),
    }
}

/// A user facing or internal service built on cloud resources
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Service {
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub access: Access,
    #[serde(default, deserialize_with = "authentication")]
    pub authentication: Option<Authentication>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub responsible: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub informations: Vec<String>,
    /// Cloud resources the service runs on, keyed by kind name
    #[serde(default, alias = "aws", deserialize_with = "lenient::string_list_map")]
    pub resources: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub dependencies: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub environment: Option<String>,
}

impl Service {
    /// Resource ids of one kind the service depends on
    #[must_use]
    pub fn resources_of(&self, kind: Kind) -> &[String] {
        self.resources
            .get(kind.as_str())
            .map_or(&[], Vec::as_slice)
    }
}

/// A piece of data handled by services
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Information {
    #[serde(default, deserialize_with = "lenient::bool_or_false")]
    pub personal_data: bool,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub responsible: Option<String>,
}

/// Someone responsible for, or with access to, the infrastructure
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Person {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub iam_user: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_legacy_aws_key() {
        let service: Service = serde_json::from_value(json!({
            "aws": {"ec2": ["i-0001", "i-0002"], "rds": "db-01"},
        }))
        .unwrap();
        assert_eq!(service.resources_of(Kind::Ec2), ["i-0001", "i-0002"]);
        assert_eq!(service.resources_of(Kind::Rds), ["db-01"]);
        assert!(service.resources_of(Kind::S3).is_empty());
    }

    #[test]
    fn test_authentication_shapes() {
        let service: Service = serde_json::from_value(json!({
            "authentication": {"method": "LDAP", "2fa": "tbd", "second_factor": true},
            "access": "Internal",
        }))
        .unwrap();
        assert_eq!(
            service.authentication,
            Some(Authentication {
                method: "LDAP".to_string(),
                second_factor: true
            })
        );
        assert_eq!(service.access, Access::Internal);

        let service: Service = serde_json::from_value(json!({"authentication": "OAuth"})).unwrap();
        assert_eq!(service.authentication.unwrap().method, "OAuth");
        assert_eq!(service.access, Access::Tbd);
    }

    #[test]
    fn test_information_personal_data_flag() {
        let info: Information =
            serde_json::from_value(json!({"personal_data": "True"})).unwrap();
        assert!(info.personal_data);
        let info: Information = serde_json::from_value(json!({"personal_data": "tbd"})).unwrap();
        assert!(!info.personal_data);
    }
}
