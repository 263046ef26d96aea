//! Route53 records

use clinv_inventory::KindData;
use serde_json::{Value, json};
use tracing::debug;

use super::{into_record, item_strings, items, str_field};
use crate::client::AwsCli;
use crate::error::AwsError;

pub(crate) async fn fetch(cli: &AwsCli) -> Result<KindData, AwsError> {
    debug!("listing hosted zones");
    let zones = cli.call(&["route53", "list-hosted-zones"], None).await?;

    let mut data = KindData::new();
    for zone in items(&zones, "HostedZones") {
        let Some(zone_id) = str_field(zone, "Id") else {
            continue;
        };
        debug!(zone = %zone_id, "listing resource record sets");
        let records = cli
            .call(
                &["route53", "list-resource-record-sets", "--hosted-zone-id", zone_id],
                None,
            )
            .await?;
        data.extend(normalize_records(zone, &records));
    }
    Ok(data)
}

fn strip_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Id of a record: `<zone id>-<name without trailing dot>-<type>`
#[must_use]
pub fn record_id(zone_id: &str, name: &str, record_type: &str) -> String {
    let zone_id = zone_id.trim_start_matches("/hostedzone/");
    format!(
        "{zone_id}-{}-{}",
        strip_dot(name),
        record_type.to_lowercase()
    )
}

/// Normalize the record sets of one hosted zone
#[must_use]
pub fn normalize_records(zone: &Value, response: &Value) -> KindData {
    let zone_id = str_field(zone, "Id").unwrap_or_default();
    let private = zone
        .get("Config")
        .and_then(|config| config.get("PrivateZone"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let hosted_zone = json!({
        "id": zone_id.trim_start_matches("/hostedzone/"),
        "name": str_field(zone, "Name").map(strip_dot),
        "private": private,
    });

    items(response, "ResourceRecordSets")
        .filter_map(|record| {
            let name = str_field(record, "Name")?;
            let record_type = str_field(record, "Type")?;
            let mut values = item_strings(record, "ResourceRecords", "Value");
            if values.is_empty()
                && let Some(alias) = record.get("AliasTarget").and_then(|a| str_field(a, "DNSName"))
            {
                values.push(alias.to_string());
            }

            let normalized = into_record(json!({
                "name": strip_dot(name),
                "record_type": record_type,
                "values": values,
                "ttl": record.get("TTL"),
                "hosted_zone": hosted_zone.clone(),
                "state": "active",
            }));
            Some((record_id(zone_id, name, record_type), normalized))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id() {
        assert_eq!(
            record_id("/hostedzone/Z1", "www.example.com.", "CNAME"),
            "Z1-www.example.com-cname"
        );
    }

    #[test]
    fn test_normalize_records() {
        let zone = json!({
            "Id": "/hostedzone/Z1",
            "Name": "example.com.",
            "Config": {"PrivateZone": true}
        });
        let response = json!({
            "ResourceRecordSets": [
                {
                    "Name": "example.com.",
                    "Type": "NS",
                    "TTL": 172800,
                    "ResourceRecords": [{"Value": "ns-1.awsdns.com."}]
                },
                {
                    "Name": "www.example.com.",
                    "Type": "A",
                    "AliasTarget": {"DNSName": "lb.amazonaws.com."}
                }
            ]
        });

        let data = normalize_records(&zone, &response);

        assert_eq!(data.len(), 2);
        let record = &data["Z1-www.example.com-a"];
        assert_eq!(record["values"], json!(["lb.amazonaws.com."]));
        assert_eq!(
            record["hosted_zone"],
            json!({"id": "Z1", "name": "example.com", "private": true})
        );
        assert_eq!(data["Z1-example.com-ns"]["ttl"], json!(172_800));
    }
}
