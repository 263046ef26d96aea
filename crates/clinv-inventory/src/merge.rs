//! Reconciliation of provider data with user annotations

use std::collections::BTreeMap;
use std::mem::discriminant;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::kind::Kind;
use crate::model::{Record, State};
use crate::registry::{self, TBD};
use crate::source::FetchScope;

/// Records of one kind keyed by id
pub type KindData = BTreeMap<String, Record>;

/// Records of every kind
pub type DataSet = BTreeMap<Kind, KindData>;

fn is_placeholder(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == TBD,
        _ => false,
    }
}

fn reports_terminated(record: Option<&Record>) -> bool {
    record
        .and_then(|r| r.get("state"))
        .and_then(Value::as_str)
        .is_some_and(|s| State::parse(s) == State::Terminated)
}

/// Merge kind defaults, provider data and user annotations, in that order
///
/// User values beat provider values, except for the state of a resource the
/// provider reports as gone. `null` user values never erase provider data.
#[must_use]
pub fn merge_record(
    kind: Kind,
    id: &str,
    source: Option<&Record>,
    user: Option<&Record>,
) -> Record {
    let mut merged = registry::spec(kind).user_defaults();
    if let Some(source) = source {
        merged.extend(source.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    let gone = reports_terminated(source);
    for (key, value) in user.into_iter().flatten() {
        if value.is_null() {
            continue;
        }
        if gone && key == "state" {
            debug!(%kind, %id, "provider reports resource gone, ignoring user state");
            continue;
        }
        if let Some(previous) = source.and_then(|s| s.get(key))
            && previous != value
            && !is_placeholder(previous)
        {
            if discriminant(previous) == discriminant(value) {
                debug!(%kind, %id, field = %key, "user value overrides provider value");
            } else {
                warn!(
                    %kind,
                    %id,
                    field = %key,
                    "user value conflicts with provider value of another type, keeping user value"
                );
            }
        }
        merged.insert(key.clone(), value.clone());
    }

    merged
}

/// Seed default annotations for resources the user hasn't seen yet
///
/// Existing user records are never touched. Returns the number of seeded ids.
pub fn seed_user_data(kind: Kind, source: &KindData, user: &mut KindData) -> usize {
    let spec = registry::spec(kind);
    let mut seeded = 0;

    for (id, record) in source {
        if user.contains_key(id) {
            continue;
        }
        let mut defaults = spec.user_defaults();
        for (user_key, source_key) in spec.seed_from {
            if let Some(value) = record.get(*source_key).filter(|v| !v.is_null()) {
                defaults.insert((*user_key).to_string(), value.clone());
            }
        }
        user.insert(id.clone(), defaults);
        seeded += 1;
    }

    if seeded > 0 {
        info!(%kind, seeded, "seeded user data for new resources");
    }
    seeded
}

/// Combine a fresh fetch of `scope` with the previously stored source data
///
/// Resources inside the scope but missing from the fetch keep their last
/// known attributes and are marked terminated. Resources outside it are kept
/// untouched. Returns the new data and the number of newly gone ids.
#[must_use]
pub fn reconcile_source(
    kind: Kind,
    scope: &FetchScope,
    previous: &KindData,
    fresh: KindData,
) -> (KindData, usize) {
    let mut data = fresh;
    let mut gone = 0;

    for (id, record) in previous {
        if data.contains_key(id) {
            continue;
        }
        let mut record = record.clone();
        if !scope.covers(&record) {
            debug!(%kind, %id, "resource outside the fetched scope, keeping it as is");
        } else if !reports_terminated(Some(&record)) {
            info!(%kind, %id, "resource no longer reported by provider, marking terminated");
            record.insert(
                "state".to_string(),
                Value::String(State::Terminated.as_str().to_string()),
            );
            gone += 1;
        }
        data.insert(id.clone(), record);
    }

    (data, gone)
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

    fn ec2_source() -> Record {
        record(json!({
            "name": "web-01",
            "region": "us-east-1",
            "instance_type": "t2.micro",
            "state": "running",
            "description": "provider description",
        }))
    }

    #[test]
    fn test_user_beats_provider() {
        let user = record(json!({"description": "frontend", "to_destroy": false}));
        let merged = merge_record(Kind::Ec2, "i-0001", Some(&ec2_source()), Some(&user));

        assert_eq!(merged["description"], json!("frontend"));
        assert_eq!(merged["to_destroy"], json!(false));
        assert_eq!(merged["instance_type"], json!("t2.micro"));
        assert_eq!(merged["environment"], json!(TBD));
    }

    #[test]
    fn test_user_null_keeps_provider_value() {
        let user = record(json!({"name": null}));
        let merged = merge_record(Kind::Ec2, "i-0001", Some(&ec2_source()), Some(&user));
        assert_eq!(merged["name"], json!("web-01"));
    }

    #[test]
    fn test_gone_resource_keeps_terminated_state() {
        let mut source = ec2_source();
        source.insert("state".to_string(), json!("terminated"));
        let user = record(json!({"state": "active", "description": "kept"}));

        let merged = merge_record(Kind::Ec2, "i-0001", Some(&source), Some(&user));

        assert_eq!(merged["state"], json!("terminated"));
        assert_eq!(merged["description"], json!("kept"));
    }

    #[test]
    fn test_seed_only_new_ids() {
        let mut source = KindData::new();
        source.insert("i-0001".to_string(), ec2_source());
        let mut monitored = ec2_source();
        monitored.insert("monitor".to_string(), json!(true));
        source.insert("i-0002".to_string(), monitored);

        let mut user = KindData::new();
        user.insert("i-0001".to_string(), record(json!({"description": "mine"})));

        let seeded = seed_user_data(Kind::Ec2, &source, &mut user);

        assert_eq!(seeded, 1);
        assert_eq!(user["i-0001"], record(json!({"description": "mine"})));
        assert_eq!(user["i-0002"]["monitor"], json!(true));
        assert_eq!(user["i-0002"]["to_destroy"], json!(TBD));
    }

    #[test]
    fn test_seed_is_idempotent() {
        let mut source = KindData::new();
        source.insert("i-0001".to_string(), ec2_source());
        let mut user = KindData::new();

        seed_user_data(Kind::Ec2, &source, &mut user);
        let first = user.clone();
        assert_eq!(seed_user_data(Kind::Ec2, &source, &mut user), 0);
        assert_eq!(user, first);
    }

    #[test]
    fn test_reconcile_marks_vanished_terminated() {
        let mut previous = KindData::new();
        previous.insert("i-0001".to_string(), ec2_source());
        previous.insert("i-0002".to_string(), ec2_source());
        let mut fresh = KindData::new();
        fresh.insert("i-0001".to_string(), ec2_source());

        let (data, gone) = reconcile_source(Kind::Ec2, &FetchScope::Global, &previous, fresh);

        assert_eq!(gone, 1);
        assert_eq!(data["i-0001"]["state"], json!("running"));
        assert_eq!(data["i-0002"]["state"], json!("terminated"));
        assert_eq!(data["i-0002"]["instance_type"], json!("t2.micro"));

        let (again, gone) =
            reconcile_source(Kind::Ec2, &FetchScope::Global, &data, KindData::new());
        assert_eq!(gone, 1);
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn test_reconcile_keeps_unqueried_regions() {
        let mut elsewhere = ec2_source();
        elsewhere.insert("region".to_string(), json!("eu-west-1"));
        let mut previous = KindData::new();
        previous.insert("i-0001".to_string(), ec2_source());
        previous.insert("i-0002".to_string(), elsewhere);

        let scope = FetchScope::Regions(vec!["us-east-1".to_string()]);
        let (data, gone) = reconcile_source(Kind::Ec2, &scope, &previous, KindData::new());

        assert_eq!(gone, 1);
        assert_eq!(data["i-0001"]["state"], json!("terminated"));
        assert_eq!(data["i-0002"]["state"], json!("running"));

        let nowhere = FetchScope::Regions(Vec::new());
        let (data, gone) = reconcile_source(Kind::Ec2, &nowhere, &previous, KindData::new());
        assert_eq!(gone, 0);
        assert_eq!(data, previous);
    }
}
