//! IAM users and groups

use clinv_inventory::{KindData, Record};
use serde_json::{Value, json};
use tracing::debug;

use super::{into_record, item_strings, items, str_field};
use crate::client::AwsCli;
use crate::error::AwsError;

pub(crate) async fn fetch_users(cli: &AwsCli) -> Result<KindData, AwsError> {
    debug!("listing iam users");
    let response = cli.call(&["iam", "list-users"], None).await?;
    Ok(normalize_users(&response))
}

pub(crate) async fn fetch_groups(cli: &AwsCli) -> Result<KindData, AwsError> {
    debug!("listing iam groups");
    let response = cli.call(&["iam", "list-groups"], None).await?;

    let mut data = KindData::new();
    for group in items(&response, "Groups") {
        let Some(name) = str_field(group, "GroupName") else {
            continue;
        };
        debug!(group = %name, "describing iam group");
        let get_group_args = ["iam", "get-group", "--group-name", name];
        let attached_args = ["iam", "list-attached-group-policies", "--group-name", name];
        let inline_args = ["iam", "list-group-policies", "--group-name", name];
        let (members, attached, inline) = futures::try_join!(
            cli.call(&get_group_args, None),
            cli.call(&attached_args, None),
            cli.call(&inline_args, None),
        )?;
        if let Some((id, record)) = normalize_group(group, &members, &attached, &inline) {
            data.insert(id, record);
        }
    }
    Ok(data)
}

fn user_id(name: &str) -> String {
    format!("iamu-{}", name.to_lowercase())
}

/// Normalize a `list-users` response
#[must_use]
pub fn normalize_users(response: &Value) -> KindData {
    items(response, "Users")
        .filter_map(|user| {
            let name = str_field(user, "UserName")?;
            let record = into_record(json!({
                "name": name,
                "arn": str_field(user, "Arn"),
                "state": "active",
            }));
            Some((user_id(name), record))
        })
        .collect()
}

/// Normalize one group from its `list-groups` entry, its `get-group` members
/// and both policy listings
#[must_use]
pub fn normalize_group(
    group: &Value,
    members: &Value,
    attached: &Value,
    inline: &Value,
) -> Option<(String, Record)> {
    let name = str_field(group, "GroupName")?;
    let users: Vec<String> = items(members, "Users")
        .filter_map(|user| str_field(user, "UserName"))
        .map(user_id)
        .collect();
    let inline_policies: Vec<&str> = items(inline, "PolicyNames")
        .filter_map(Value::as_str)
        .collect();

    let record = into_record(json!({
        "name": name,
        "arn": str_field(group, "Arn"),
        "users": users,
        "attached_policies": item_strings(attached, "AttachedPolicies", "PolicyArn"),
        "inline_policies": inline_policies,
        "state": "active",
    }));
    Some((format!("iamg-{}", name.to_lowercase()), record))
}
