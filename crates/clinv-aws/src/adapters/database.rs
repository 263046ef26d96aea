//! RDS instances

use clinv_inventory::KindData;
use serde_json::{Value, json};
use tracing::debug;

use super::{into_record, item_strings, items, str_field};
use crate::client::AwsCli;
use crate::error::AwsError;

pub(crate) async fn fetch(cli: &AwsCli, region: &str) -> Result<KindData, AwsError> {
    debug!(region, "describing rds instances");
    let response = cli.call(&["rds", "describe-db-instances"], Some(region)).await?;
    Ok(normalize_databases(region, &response))
}

/// Normalize a `describe-db-instances` response
///
/// Instances are keyed by their resource id, which survives renames.
#[must_use]
pub fn normalize_databases(region: &str, response: &Value) -> KindData {
    items(response, "DBInstances")
        .filter_map(|instance| {
            let name = str_field(instance, "DBInstanceIdentifier");
            let id = str_field(instance, "DbiResourceId").or(name)?;
            let endpoint = instance.get("Endpoint").and_then(|endpoint| {
                let address = str_field(endpoint, "Address")?;
                Some(match endpoint.get("Port").and_then(Value::as_u64) {
                    Some(port) => format!("{address}:{port}"),
                    None => address.to_string(),
                })
            });

            let record = into_record(json!({
                "name": name,
                "region": region,
                "engine": str_field(instance, "Engine"),
                "engine_version": str_field(instance, "EngineVersion"),
                "instance_class": str_field(instance, "DBInstanceClass"),
                "state": str_field(instance, "DBInstanceStatus"),
                "endpoint": endpoint,
                "security_groups":
                    item_strings(instance, "VpcSecurityGroups", "VpcSecurityGroupId"),
                "vpc": instance.get("DBSubnetGroup").and_then(|g| str_field(g, "VpcId")),
                "arn": str_field(instance, "DBInstanceArn"),
            }));
            Some((id.to_string(), record))
        })
        .collect()
}
