//! EC2 instances and autoscaling groups

use clinv_inventory::KindData;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{into_record, item_strings, items, str_field, tags};
use crate::client::AwsCli;
use crate::error::AwsError;

pub(crate) async fn fetch_instances(cli: &AwsCli, region: &str) -> Result<KindData, AwsError> {
    debug!(region, "describing ec2 instances");
    let response = cli.call(&["ec2", "describe-instances"], Some(region)).await?;
    Ok(normalize_instances(region, &response))
}

pub(crate) async fn fetch_asgs(cli: &AwsCli, region: &str) -> Result<KindData, AwsError> {
    debug!(region, "describing autoscaling groups");
    let response = cli
        .call(&["autoscaling", "describe-auto-scaling-groups"], Some(region))
        .await?;
    Ok(normalize_asgs(region, &response))
}

fn push_unique(list: &mut Vec<String>, value: Option<&str>) {
    if let Some(value) = value
        && !list.iter().any(|v| v == value)
    {
        list.push(value.to_string());
    }
}

/// Normalize a `describe-instances` response
#[must_use]
pub fn normalize_instances(region: &str, response: &Value) -> KindData {
    let mut data = KindData::new();

    for instance in items(response, "Reservations").flat_map(|r| items(r, "Instances")) {
        let Some(id) = str_field(instance, "InstanceId") else {
            warn!(region, "skipping instance without id");
            continue;
        };

        let tags = tags(instance);
        let mut private_ips = Vec::new();
        let mut public_ips = Vec::new();
        for address in items(instance, "NetworkInterfaces")
            .flat_map(|interface| items(interface, "PrivateIpAddresses"))
        {
            push_unique(&mut private_ips, str_field(address, "PrivateIpAddress"));
            push_unique(
                &mut public_ips,
                address.get("Association").and_then(|a| str_field(a, "PublicIp")),
            );
        }
        push_unique(&mut private_ips, str_field(instance, "PrivateIpAddress"));
        push_unique(&mut public_ips, str_field(instance, "PublicIpAddress"));

        let security_groups: serde_json::Map<String, Value> = items(instance, "SecurityGroups")
            .filter_map(|sg| {
                Some((
                    str_field(sg, "GroupId")?.to_string(),
                    Value::String(str_field(sg, "GroupName").unwrap_or_default().to_string()),
                ))
            })
            .collect();

        let monitored = tags
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("monitor") && v.eq_ignore_ascii_case("true"));

        let record = into_record(json!({
            "name": tags.get("Name"),
            "region": region,
            "instance_type": str_field(instance, "InstanceType"),
            "state": instance.get("State").and_then(|s| str_field(s, "Name")),
            "state_reason": instance.get("StateReason").and_then(|s| str_field(s, "Message")),
            "launch_time": str_field(instance, "LaunchTime"),
            "private_ips": private_ips,
            "public_ips": public_ips,
            "security_groups": security_groups,
            "vpc": str_field(instance, "VpcId"),
            "tags": tags,
            "monitor": monitored.then_some(true),
        }));
        data.insert(id.to_string(), record);
    }

    data
}

/// Normalize a `describe-auto-scaling-groups` response
#[must_use]
pub fn normalize_asgs(region: &str, response: &Value) -> KindData {
    items(response, "AutoScalingGroups")
        .filter_map(|group| {
            let name = str_field(group, "AutoScalingGroupName")?;
            let launch_template = group
                .get("LaunchTemplate")
                .and_then(|t| str_field(t, "LaunchTemplateName"))
                .or_else(|| str_field(group, "LaunchConfigurationName"));

            let record = into_record(json!({
                "name": name,
                "region": region,
                "state": "active",
                "arn": str_field(group, "AutoScalingGroupARN"),
                "min_size": group.get("MinSize"),
                "max_size": group.get("MaxSize"),
                "desired_capacity": group.get("DesiredCapacity"),
                "instances": item_strings(group, "Instances", "InstanceId"),
                "launch_template": launch_template,
            }));
            Some((format!("asg-{name}"), record))
        })
        .collect()
}
