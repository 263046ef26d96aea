//! Cloud resources discovered by the source adapters

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::entity::MonitorStatus;
use super::lenient;
use super::risk::Access;

/// User annotations shared by every cloud kind
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Annotations {
    /// `None` until the user decides
    #[serde(default, deserialize_with = "lenient::flag")]
    pub to_destroy: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub environment: Option<String>,
    #[serde(default)]
    pub monitor: MonitorStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Ec2Instance {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub instance_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub private_ips: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub public_ips: Vec<String>,
    /// Security group id to group name
    #[serde(default, deserialize_with = "lenient::string_map")]
    pub security_groups: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub vpc: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub state_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub launch_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::string_map")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RdsInstance {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub engine: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub engine_version: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub instance_class: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub endpoint: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub security_groups: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub vpc: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub arn: Option<String>,
}

/// Read and write exposure of a bucket
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BucketPermissions {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub read: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub write: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct S3Bucket {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub region: Option<String>,
    /// Exposure reported by the provider
    #[serde(default)]
    pub permissions: BucketPermissions,
    /// Exposure the user expects
    #[serde(default)]
    pub desired_permissions: BucketPermissions,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HostedZone {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::bool_or_false")]
    pub private: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DnsRecord {
    #[serde(default, alias = "type", deserialize_with = "lenient::opt_string")]
    pub record_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub values: Vec<String>,
    #[serde(default)]
    pub hosted_zone: HostedZone,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub ttl: Option<u64>,
}

impl DnsRecord {
    /// Records in private zones are only reachable from inside the network
    #[must_use]
    pub fn access(&self) -> Access {
        if self.hosted_zone.private {
            Access::Private
        } else {
            Access::Public
        }
    }

    /// Zone bookkeeping records that nobody owns
    #[must_use]
    pub fn is_zone_record(&self) -> bool {
        matches!(self.record_type.as_deref(), Some("SOA" | "NS"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IamGroup {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub arn: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub users: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub desired_users: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub inline_policies: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub attached_policies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IamUser {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub arn: Option<String>,
}

/// A single ingress or egress permission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRule {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub protocol: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub from_port: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub to_port: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub cidrs: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub security_groups: Vec<String>,
}

impl SecurityRule {
    /// Check if the port falls inside the rule range
    ///
    /// Rules without ports (all traffic) cover every port.
    #[must_use]
    pub fn covers_port(&self, port: i64) -> bool {
        match (self.from_port, self.to_port) {
            (Some(from), Some(to)) => (from..=to).contains(&port),
            (Some(from), None) => from == port,
            (None, _) => self.protocol.as_deref() == Some("-1"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SecurityGroup {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub vpc: Option<String>,
    #[serde(default)]
    pub ingress: Vec<SecurityRule>,
    #[serde(default)]
    pub egress: Vec<SecurityRule>,
    #[serde(default)]
    pub desired_ingress: Option<Vec<SecurityRule>>,
    #[serde(default)]
    pub desired_egress: Option<Vec<SecurityRule>>,
}

impl SecurityGroup {
    fn rules(&self) -> impl Iterator<Item = &SecurityRule> {
        self.ingress.iter().chain(self.egress.iter())
    }

    /// Whether the provider rules equal the rules the user expects
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.desired_ingress.as_ref() == Some(&self.ingress)
            && self.desired_egress.as_ref() == Some(&self.egress)
    }

    /// Peer groups referenced by any rule
    pub fn referenced_groups(&self) -> impl Iterator<Item = &str> {
        self.rules()
            .flat_map(|rule| rule.security_groups.iter().map(String::as_str))
    }

    /// Integer patterns match groups whose rules open that port
    #[must_use]
    pub fn matches_port(&self, pattern: &Regex) -> bool {
        pattern
            .as_str()
            .trim()
            .parse::<i64>()
            .is_ok_and(|port| self.rules().any(|rule| rule.covers_port(port)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Vpc {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cidr: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AutoScalingGroup {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub region: Option<String>,
    /// Member EC2 instance ids
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub instances: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub min_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub max_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_u64")]
    pub desired_capacity: Option<u64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub launch_template: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group() -> SecurityGroup {
        serde_json::from_value(json!({
            "region": "us-east-1",
            "ingress": [
                {"protocol": "tcp", "from_port": 80, "to_port": 443, "cidrs": ["0.0.0.0/0"]},
                {
                    "protocol": "tcp",
                    "from_port": 22,
                    "to_port": 22,
                    "security_groups": ["sg-bastion"]
                },
            ],
            "egress": [{"protocol": "-1", "cidrs": ["0.0.0.0/0"]}],
        }))
        .unwrap()
    }

    #[test]
    fn test_port_matching() {
        let sg = group();
        let port = |p: &str| Regex::new(p).unwrap();
        assert!(sg.matches_port(&port("443")));
        assert!(sg.matches_port(&port("22")));
        assert!(!sg.matches_port(&port("sg-")));
    }

    #[test]
    fn test_synchronization() {
        let mut sg = group();
        assert!(!sg.is_synchronized());
        sg.desired_ingress = Some(sg.ingress.clone());
        sg.desired_egress = Some(sg.egress.clone());
        assert!(sg.is_synchronized());
        sg.desired_ingress = Some(Vec::new());
        assert!(!sg.is_synchronized());
    }

    #[test]
    fn test_referenced_groups() {
        let sg = group();
        assert_eq!(sg.referenced_groups().collect::<Vec<_>>(), vec!["sg-bastion"]);
    }

    #[test]
    fn test_zone_records() {
        let record: DnsRecord =
            serde_json::from_value(json!({"record_type": "NS", "hosted_zone": {"private": true}}))
                .unwrap();
        assert!(record.is_zone_record());
        assert_eq!(record.access(), Access::Private);
    }
}
