//! Kind registry
//!
//! Static description of every kind: whether a provider feeds it, which
//! provider fields are mandatory, and what user annotations are seeded when
//! a resource is first discovered.

use serde_json::{Value, json};

use crate::kind::Kind;
use crate::model::Record;

/// Placeholder for annotations the user still has to fill in
pub const TBD: &str = "tbd";

/// How a kind is loaded and seeded
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub kind: Kind,
    /// Whether a source adapter produces this kind
    pub source_backed: bool,
    /// Provider fields a record can't be loaded without
    pub required: &'static [&'static str],
    /// User annotation keys filled from provider keys when seeding
    pub seed_from: &'static [(&'static str, &'static str)],
    defaults: fn() -> Value,
}

impl KindSpec {
    /// Default user annotations for a newly discovered resource
    #[must_use]
    pub fn user_defaults(&self) -> Record {
        match (self.defaults)() {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    /// First required field missing from a record
    #[must_use]
    pub fn missing_field(&self, record: &Record) -> Option<&'static str> {
        self.required
            .iter()
            .copied()
            .find(|field| record.get(*field).is_none_or(Value::is_null))
    }
}

fn no_defaults() -> Value {
    json!({})
}

fn instance_defaults() -> Value {
    json!({
        "description": "",
        "to_destroy": TBD,
        "environment": TBD,
        "monitor": TBD,
    })
}

fn bucket_defaults() -> Value {
    json!({
        "description": "",
        "to_destroy": TBD,
        "environment": TBD,
        "desired_permissions": {"read": TBD, "write": TBD},
        "state": "active",
    })
}

fn record_defaults() -> Value {
    json!({
        "description": TBD,
        "to_destroy": TBD,
        "monitor": TBD,
        "state": "active",
    })
}

fn security_group_defaults() -> Value {
    json!({
        "description": TBD,
        "to_destroy": TBD,
        "desired_ingress": [],
        "desired_egress": [],
    })
}

fn plain_defaults() -> Value {
    json!({
        "description": TBD,
        "to_destroy": TBD,
    })
}

fn iam_group_defaults() -> Value {
    json!({
        "description": TBD,
        "to_destroy": TBD,
        "desired_users": [],
    })
}

fn iam_user_defaults() -> Value {
    plain_defaults()
}

const fn user_kind(kind: Kind) -> KindSpec {
    KindSpec {
        kind,
        source_backed: false,
        required: &[],
        seed_from: &[],
        defaults: no_defaults,
    }
}

static SPECS: [KindSpec; 13] = [
    user_kind(Kind::Projects),
    user_kind(Kind::Services),
    user_kind(Kind::Informations),
    user_kind(Kind::People),
    KindSpec {
        kind: Kind::Ec2,
        source_backed: true,
        required: &["region", "instance_type"],
        seed_from: &[("monitor", "monitor")],
        defaults: instance_defaults,
    },
    KindSpec {
        kind: Kind::Rds,
        source_backed: true,
        required: &["region", "engine"],
        seed_from: &[],
        defaults: instance_defaults,
    },
    KindSpec {
        kind: Kind::S3,
        source_backed: true,
        required: &[],
        seed_from: &[],
        defaults: bucket_defaults,
    },
    KindSpec {
        kind: Kind::Route53,
        source_backed: true,
        required: &["record_type", "hosted_zone"],
        seed_from: &[],
        defaults: record_defaults,
    },
    KindSpec {
        kind: Kind::IamGroups,
        source_backed: true,
        required: &[],
        seed_from: &[("desired_users", "users")],
        defaults: iam_group_defaults,
    },
    KindSpec {
        kind: Kind::IamUsers,
        source_backed: true,
        required: &[],
        seed_from: &[],
        defaults: iam_user_defaults,
    },
    KindSpec {
        kind: Kind::SecurityGroups,
        source_backed: true,
        required: &["region"],
        seed_from: &[("desired_ingress", "ingress"), ("desired_egress", "egress")],
        defaults: security_group_defaults,
    },
    KindSpec {
        kind: Kind::Vpc,
        source_backed: true,
        required: &["region"],
        seed_from: &[],
        defaults: plain_defaults,
    },
    KindSpec {
        kind: Kind::Asg,
        source_backed: true,
        required: &["region"],
        seed_from: &[],
        defaults: plain_defaults,
    },
];

/// Registry entry for a kind
#[must_use]
pub fn spec(kind: Kind) -> &'static KindSpec {
    // SPECS is declared in the same order as Kind::ALL
    &SPECS[kind as usize]
}
