//! Entity wrapper shared by every kind

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::Details;
use super::cloud::Annotations;
use super::lenient;
use crate::error::InventoryError;
use crate::kind::Kind;

/// Raw attribute map of a single resource, as stored in the data files
pub type Record = serde_json::Map<String, Value>;

// ============================================================================
// State
// ============================================================================

/// Normalized lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum State {
    Active,
    Pending,
    Stopped,
    Terminated,
    #[default]
    Unknown,
}

impl State {
    /// Normalize a provider or user spelling
    ///
    /// Anything not recognised, including `tbd`, is `Unknown`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "active" | "running" | "available" | "in-use" | "inservice" | "in service" => {
                State::Active
            }
            "pending" | "creating" | "starting" | "rebooting" | "modifying" | "backing-up" => {
                State::Pending
            }
            "stopped" | "stopping" => State::Stopped,
            "terminated" | "shutting-down" | "deleted" | "deleting" => State::Terminated,
            _ => State::Unknown,
        }
    }

    /// Canonical spelling
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            State::Active => "active",
            State::Pending => "pending",
            State::Stopped => "stopped",
            State::Terminated => "terminated",
            State::Unknown => "unknown",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for State {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => State::parse(&s),
            _ => State::Unknown,
        })
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// Monitor status
// ============================================================================

/// Whether a cloud resource is covered by monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MonitorStatus {
    Monitored,
    Unmonitored,
    #[default]
    Unknown,
}

impl MonitorStatus {
    /// Spelling used in the data files and on the command line
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MonitorStatus::Monitored => "true",
            MonitorStatus::Unmonitored => "false",
            MonitorStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "monitored" | "yes" => Ok(MonitorStatus::Monitored),
            "false" | "unmonitored" | "no" => Ok(MonitorStatus::Unmonitored),
            "unknown" | "tbd" => Ok(MonitorStatus::Unknown),
            other => Err(format!("invalid monitor status: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for MonitorStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(
            match lenient::parse_flag(&Value::deserialize(deserializer)?) {
                Some(true) => MonitorStatus::Monitored,
                Some(false) => MonitorStatus::Unmonitored,
                None => MonitorStatus::Unknown,
            },
        )
    }
}

// ============================================================================
// Entity
// ============================================================================

#[derive(Deserialize)]
struct Common {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    description: Option<String>,
    #[serde(default)]
    state: State,
}

/// A single node of the inventory graph
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Identifier, unique within the kind
    pub id: String,
    /// Display name, if any
    pub name: Option<String>,
    /// Free text description
    pub description: Option<String>,
    /// Normalized lifecycle state
    pub state: State,
    /// User annotations, present on cloud kinds only
    pub annotations: Option<Annotations>,
    /// Kind specific attributes
    pub details: Details,
}

impl Entity {
    /// Build an entity from its merged record
    ///
    /// # Errors
    /// Returns `DataIntegrity` if a field has a shape that can't be interpreted.
    pub fn from_record(kind: Kind, id: &str, record: &Record) -> Result<Self, InventoryError> {
        let value = Value::Object(record.clone());
        let integrity = |e: serde_json::Error| InventoryError::DataIntegrity {
            kind,
            id: id.to_string(),
            message: e.to_string(),
        };

        let common: Common = serde_json::from_value(value.clone()).map_err(integrity)?;
        let annotations = if kind.is_cloud() {
            Some(serde_json::from_value(value.clone()).map_err(integrity)?)
        } else {
            None
        };
        let details = Details::parse(kind, value).map_err(integrity)?;

        Ok(Self {
            id: id.to_string(),
            name: common.name,
            description: common.description,
            state: common.state,
            annotations,
            details,
        })
    }

    /// Kind of the entity
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.details.kind()
    }

    /// Name, falling back to the id when unset
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.id)
    }

    /// `(id, name)` pair used by list style reports
    #[must_use]
    pub fn short_label(&self) -> (&str, &str) {
        (&self.id, self.display_name())
    }

    /// Whether the entity still exists
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state != State::Terminated
    }

    /// Monitor status; risk management kinds are always `Unknown`
    #[must_use]
    pub fn monitor_status(&self) -> MonitorStatus {
        self.annotations
            .as_ref()
            .map_or(MonitorStatus::Unknown, |a| a.monitor)
    }

    /// Whether the user flagged the resource for removal
    #[must_use]
    pub fn to_destroy(&self) -> Option<bool> {
        self.annotations.as_ref().and_then(|a| a.to_destroy)
    }

    /// Region of the resource, if the kind has one
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.details.region()
    }

    /// Every text field a search pattern is evaluated against
    #[must_use]
    pub fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.id.as_str()];
        fields.extend(self.name.as_deref());
        fields.extend(self.description.as_deref());
        if let Some(annotations) = &self.annotations {
            fields.extend(annotations.environment.as_deref());
        }
        self.details.collect_fields(&mut fields);
        fields
    }

    /// Check if the pattern matches any searchable field
    ///
    /// The regex is expected to be built case-insensitive; matching is
    /// unanchored.
    #[must_use]
    pub fn matches(&self, regex: &Regex) -> bool {
        self.search_fields().iter().any(|field| regex.is_match(field))
            || self.details.matches_related(regex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_state_normalization() {
        assert_eq!(State::parse("running"), State::Active);
        assert_eq!(State::parse("available"), State::Active);
        assert_eq!(State::parse("stopping"), State::Stopped);
        assert_eq!(State::parse("shutting-down"), State::Terminated);
        assert_eq!(State::parse("tbd"), State::Unknown);
        assert_eq!(State::parse("Terminated"), State::Terminated);
    }

    #[test]
    fn test_malformed_state_is_unknown() {
        let entity = Entity::from_record(
            Kind::Informations,
            "inf-01",
            &record(json!({"name": "Users", "state": ["weird"]})),
        )
        .unwrap();
        assert_eq!(entity.state, State::Unknown);
    }

    #[test]
    fn test_name_falls_back_to_id() {
        let entity = Entity::from_record(
            Kind::People,
            "peo-01",
            &record(json!({"name": "", "state": "active"})),
        )
        .unwrap();
        assert_eq!(entity.short_label(), ("peo-01", "peo-01"));
    }

    #[test]
    fn test_monitor_status_from_annotations() {
        let entity = Entity::from_record(
            Kind::Ec2,
            "i-0001",
            &record(json!({
                "region": "us-east-1",
                "instance_type": "t2.micro",
                "state": "running",
                "monitor": "True",
            })),
        )
        .unwrap();
        assert_eq!(entity.monitor_status(), MonitorStatus::Monitored);
        assert!(entity.is_active());
    }

    #[test]
    fn test_monitor_status_parse() {
        assert_eq!("true".parse::<MonitorStatus>().unwrap(), MonitorStatus::Monitored);
        assert_eq!("unknown".parse::<MonitorStatus>().unwrap(), MonitorStatus::Unknown);
        assert!("maybe".parse::<MonitorStatus>().is_err());
    }

    #[test]
    fn test_matches_case_insensitive() {
        let entity = Entity::from_record(
            Kind::Services,
            "ser-01",
            &record(json!({"name": "Clinv homepage", "aliases": ["web"]})),
        )
        .unwrap();
        let regex = regex::RegexBuilder::new("HOMEPAGE")
            .case_insensitive(true)
            .build()
            .unwrap();
        assert!(entity.matches(&regex));
    }
}
