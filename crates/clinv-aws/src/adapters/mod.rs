//! Source adapters for every AWS kind
//!
//! Each module calls the CLI and normalizes the answer into clinv records.
//! Normalization is a pure function of the JSON response so it can be
//! tested without the provider.

mod compute;
mod database;
mod dns;
mod iam;
mod network;
mod storage;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use clinv_inventory::{
    FetchScope, Kind, KindData, Record, SourceAdapter, SourceError, SourceRegistry,
};
use futures::future::try_join_all;
use serde_json::Value;
use tracing::{info, instrument};

use crate::client::AwsCli;
use crate::error::AwsError;

pub use compute::{normalize_asgs, normalize_instances};
pub use database::normalize_databases;
pub use dns::{normalize_records, record_id};
pub use iam::{normalize_group, normalize_users};
pub use network::{normalize_security_groups, normalize_vpcs};
pub use storage::{bucket_permissions, normalize_bucket};

/// Adapter serving one kind from the AWS CLI
#[derive(Debug, Clone)]
pub struct AwsAdapter {
    kind: Kind,
    cli: Arc<AwsCli>,
    regions: Vec<String>,
}

impl AwsAdapter {
    pub fn new(kind: Kind, cli: Arc<AwsCli>, regions: Vec<String>) -> Self {
        Self { kind, cli, regions }
    }

    /// Whether the kind is listed region by region
    fn is_regional(&self) -> bool {
        matches!(
            self.kind,
            Kind::Ec2 | Kind::Asg | Kind::Rds | Kind::SecurityGroups | Kind::Vpc
        )
    }
}

#[async_trait]
impl SourceAdapter for AwsAdapter {
    fn kind(&self) -> Kind {
        self.kind
    }

    fn scope(&self) -> FetchScope {
        if self.is_regional() {
            FetchScope::Regions(self.regions.clone())
        } else {
            FetchScope::Global
        }
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    async fn fetch(&self) -> Result<KindData, SourceError> {
        if self.is_regional() && self.regions.is_empty() {
            return Err(SourceError::Unavailable(format!(
                "no AWS regions configured for {}",
                self.kind
            )));
        }
        info!("fetching resources from AWS");
        let cli = self.cli.as_ref();
        let regions = self.regions.as_slice();

        let data = match self.kind {
            Kind::Ec2 => per_region(regions, |r| compute::fetch_instances(cli, r)).await,
            Kind::Asg => per_region(regions, |r| compute::fetch_asgs(cli, r)).await,
            Kind::Rds => per_region(regions, |r| database::fetch(cli, r)).await,
            Kind::SecurityGroups => {
                per_region(regions, |r| network::fetch_security_groups(cli, r)).await
            }
            Kind::Vpc => per_region(regions, |r| network::fetch_vpcs(cli, r)).await,
            Kind::S3 => storage::fetch(cli).await,
            Kind::Route53 => dns::fetch(cli).await,
            Kind::IamUsers => iam::fetch_users(cli).await,
            Kind::IamGroups => iam::fetch_groups(cli).await,
            Kind::Projects | Kind::Services | Kind::Informations | Kind::People => {
                return Err(SourceError::Unavailable(format!(
                    "{} are not provided by AWS",
                    self.kind
                )));
            }
        }?;

        info!(count = data.len(), "resources fetched");
        Ok(data)
    }
}

/// Adapters for every cloud kind
#[must_use]
pub fn registry(cli: Arc<AwsCli>, regions: &[String]) -> SourceRegistry {
    Kind::cloud().fold(SourceRegistry::new(), |registry, kind| {
        registry.with_adapter(Arc::new(AwsAdapter::new(
            kind,
            Arc::clone(&cli),
            regions.to_vec(),
        )))
    })
}

/// Fetch every region concurrently; any failing region fails the kind
async fn per_region<'a, F, Fut>(regions: &'a [String], fetch: F) -> Result<KindData, AwsError>
where
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = Result<KindData, AwsError>>,
{
    let results = try_join_all(regions.iter().map(|region| fetch(region.as_str()))).await?;
    Ok(results.into_iter().flatten().collect())
}

// ============================================================================
// JSON helpers
// ============================================================================

/// Build a record from a JSON object, dropping `null` fields
pub(crate) fn into_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        _ => Record::new(),
    }
}

/// Items of an array field; missing or non-array fields yield nothing
pub(crate) fn items<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value.get(key).and_then(Value::as_array).into_iter().flatten()
}

/// String field of every item of an array field
pub(crate) fn item_strings(value: &Value, key: &str, field: &str) -> Vec<String> {
    items(value, key)
        .filter_map(|item| item.get(field).and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// AWS `[{Key, Value}]` tag list as a map
pub(crate) fn tags(value: &Value) -> BTreeMap<String, String> {
    items(value, "Tags")
        .filter_map(|tag| {
            let key = str_field(tag, "Key")?;
            let value = str_field(tag, "Value")?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
