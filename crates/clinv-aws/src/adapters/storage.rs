//! S3 buckets

use clinv_inventory::KindData;
use clinv_inventory::model::Record;
use futures::future::join_all;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{into_record, items, str_field};
use crate::client::AwsCli;
use crate::error::AwsError;

const ALL_USERS: &str = "http://acs.amazonaws.com/groups/global/AllUsers";

pub(crate) async fn fetch(cli: &AwsCli) -> Result<KindData, AwsError> {
    debug!("listing s3 buckets");
    let response = cli.call(&["s3api", "list-buckets"], None).await?;
    let buckets: Vec<&Value> = items(&response, "Buckets").collect();

    let acls = join_all(buckets.iter().map(|bucket| async move {
        let name = str_field(bucket, "Name")?;
        match cli
            .call(&["s3api", "get-bucket-acl", "--bucket", name], None)
            .await
        {
            Ok(acl) => Some(acl),
            Err(e) => {
                warn!(bucket = %name, error = %e, "failed to read bucket acl");
                None
            }
        }
    }))
    .await;

    Ok(buckets
        .into_iter()
        .zip(acls)
        .filter_map(|(bucket, acl)| normalize_bucket(bucket, acl.as_ref()))
        .collect())
}

/// Public exposure of a bucket from its ACL, as `(read, write)`
#[must_use]
pub fn bucket_permissions(acl: &Value) -> (&'static str, &'static str) {
    let mut read = false;
    let mut write = false;

    for grant in items(acl, "Grants") {
        let public = grant
            .get("Grantee")
            .and_then(|grantee| str_field(grantee, "URI"))
            == Some(ALL_USERS);
        if !public {
            continue;
        }
        match str_field(grant, "Permission") {
            Some("READ") => read = true,
            Some("WRITE") => write = true,
            Some("FULL_CONTROL") => {
                read = true;
                write = true;
            }
            _ => {}
        }
    }

    let level = |public: bool| if public { "public" } else { "private" };
    (level(read), level(write))
}

/// Normalize one `list-buckets` entry; without an ACL the exposure is unknown
#[must_use]
pub fn normalize_bucket(bucket: &Value, acl: Option<&Value>) -> Option<(String, Record)> {
    let name = str_field(bucket, "Name")?;
    let permissions = acl.map(|acl| {
        let (read, write) = bucket_permissions(acl);
        json!({"read": read, "write": write})
    });

    let record = into_record(json!({
        "name": name,
        "state": "active",
        "created": str_field(bucket, "CreationDate"),
        "permissions": permissions,
    }));
    Some((format!("s3-{name}"), record))
}
