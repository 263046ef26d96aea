//! Security groups and VPCs

use std::collections::BTreeMap;

use clinv_inventory::KindData;
use serde_json::{Value, json};
use tracing::debug;

use super::{into_record, item_strings, items, str_field, tags};
use crate::client::AwsCli;
use crate::error::AwsError;

pub(crate) async fn fetch_security_groups(
    cli: &AwsCli,
    region: &str,
) -> Result<KindData, AwsError> {
    debug!(region, "describing security groups");
    let response = cli
        .call(&["ec2", "describe-security-groups"], Some(region))
        .await?;
    Ok(normalize_security_groups(region, &response))
}

pub(crate) async fn fetch_vpcs(cli: &AwsCli, region: &str) -> Result<KindData, AwsError> {
    debug!(region, "describing vpcs");
    let (vpcs, subnets) = futures::try_join!(
        cli.call(&["ec2", "describe-vpcs"], Some(region)),
        cli.call(&["ec2", "describe-subnets"], Some(region)),
    )?;
    Ok(normalize_vpcs(region, &vpcs, &subnets))
}

fn rule(permission: &Value) -> Value {
    let mut cidrs = item_strings(permission, "IpRanges", "CidrIp");
    cidrs.extend(item_strings(permission, "Ipv6Ranges", "CidrIpv6"));

    json!({
        "protocol": str_field(permission, "IpProtocol").unwrap_or("-1"),
        "from_port": permission.get("FromPort"),
        "to_port": permission.get("ToPort"),
        "cidrs": cidrs,
        "security_groups": item_strings(permission, "UserIdGroupPairs", "GroupId"),
    })
}

/// Normalize a `describe-security-groups` response
#[must_use]
pub fn normalize_security_groups(region: &str, response: &Value) -> KindData {
    items(response, "SecurityGroups")
        .filter_map(|group| {
            let id = str_field(group, "GroupId")?;
            let ingress: Vec<Value> = items(group, "IpPermissions").map(rule).collect();
            let egress: Vec<Value> = items(group, "IpPermissionsEgress").map(rule).collect();

            let record = into_record(json!({
                "name": str_field(group, "GroupName"),
                "description": str_field(group, "Description"),
                "region": region,
                "vpc": str_field(group, "VpcId"),
                "state": "active",
                "ingress": ingress,
                "egress": egress,
            }));
            Some((id.to_string(), record))
        })
        .collect()
}

/// Normalize `describe-vpcs` together with the region's subnets
#[must_use]
pub fn normalize_vpcs(region: &str, vpcs: &Value, subnets: &Value) -> KindData {
    let mut by_vpc: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for subnet in items(subnets, "Subnets") {
        if let (Some(vpc), Some(subnet_id)) =
            (str_field(subnet, "VpcId"), str_field(subnet, "SubnetId"))
        {
            by_vpc.entry(vpc).or_default().push(subnet_id);
        }
    }

    items(vpcs, "Vpcs")
        .filter_map(|vpc| {
            let id = str_field(vpc, "VpcId")?;
            let record = into_record(json!({
                "name": tags(vpc).remove("Name"),
                "region": region,
                "cidr": str_field(vpc, "CidrBlock"),
                "state": str_field(vpc, "State"),
                "subnets": by_vpc.get(id).cloned().unwrap_or_default(),
            }));
            Some((id.to_string(), record))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_security_groups() {
        let response = json!({
            "SecurityGroups": [{
                "GroupId": "sg-01",
                "GroupName": "web",
                "Description": "web servers",
                "VpcId": "vpc-01",
                "IpPermissions": [{
                    "IpProtocol": "tcp",
                    "FromPort": 443,
                    "ToPort": 443,
                    "IpRanges": [{"CidrIp": "0.0.0.0/0"}],
                    "Ipv6Ranges": [{"CidrIpv6": "::/0"}],
                    "UserIdGroupPairs": []
                }],
                "IpPermissionsEgress": [{
                    "IpProtocol": "-1",
                    "UserIdGroupPairs": [{"GroupId": "sg-02"}]
                }]
            }]
        });

        let data = normalize_security_groups("us-east-1", &response);

        let record = &data["sg-01"];
        assert_eq!(record["name"], json!("web"));
        assert_eq!(
            record["ingress"],
            json!([{
                "protocol": "tcp",
                "from_port": 443,
                "to_port": 443,
                "cidrs": ["0.0.0.0/0", "::/0"],
                "security_groups": []
            }])
        );
        assert_eq!(record["egress"][0]["security_groups"], json!(["sg-02"]));
        assert_eq!(record["egress"][0]["from_port"], Value::Null);
    }

    #[test]
    fn test_normalize_vpcs() {
        let vpcs = json!({
            "Vpcs": [
                {"VpcId": "vpc-01", "CidrBlock": "10.0.0.0/16", "State": "available",
                 "Tags": [{"Key": "Name", "Value": "main"}]},
                {"VpcId": "vpc-02", "CidrBlock": "10.1.0.0/16", "State": "pending"}
            ]
        });
        let subnets = json!({
            "Subnets": [
                {"SubnetId": "subnet-a", "VpcId": "vpc-01"},
                {"SubnetId": "subnet-b", "VpcId": "vpc-01"}
            ]
        });

        let data = normalize_vpcs("us-east-1", &vpcs, &subnets);

        assert_eq!(data["vpc-01"]["name"], json!("main"));
        assert_eq!(data["vpc-01"]["subnets"], json!(["subnet-a", "subnet-b"]));
        assert_eq!(data["vpc-02"]["subnets"], json!([]));
        assert!(!data["vpc-02"].contains_key("name"));
    }
}
