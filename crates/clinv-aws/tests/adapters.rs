use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use clinv_aws::*;
use clinv_inventory::{Kind, SourceAdapter, SourceError};

// Answers keyed by the `<service> <operation>` prefix of the call
struct MockRunner {
    answers: BTreeMap<String, (i32, String)>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MockRunner {
    fn new() -> Self {
        Self {
            answers: BTreeMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn answer(mut self, operation: &str, body: serde_json::Value) -> Self {
        self.answers
            .insert(operation.to_string(), (0, body.to_string()));
        self
    }

    fn fail(mut self, operation: &str, stderr: &str) -> Self {
        self.answers
            .insert(operation.to_string(), (255, stderr.to_string()));
        self
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, _program: &str, args: &[String]) -> Result<CommandResult, AwsError> {
        self.calls.lock().unwrap().push(args.to_vec());
        let operation = args[..2].join(" ");
        let (status, output) = self
            .answers
            .get(&operation)
            .cloned()
            .unwrap_or((0, String::new()));
        let (stdout, stderr) = if status == 0 {
            (output, String::new())
        } else {
            (String::new(), output)
        };
        Ok(CommandResult {
            status,
            stdout,
            stderr,
            duration: Duration::from_millis(1),
        })
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[String],
        _timeout: Duration,
    ) -> Result<CommandResult, AwsError> {
        self.run(program, args).await
    }

    fn runner_type(&self) -> &'static str {
        "mock"
    }
}

fn config(regions: &[&str]) -> AwsConfig {
    AwsConfig {
        regions: regions.iter().map(|r| (*r).to_string()).collect(),
        profile: Some("audit".to_string()),
        ..AwsConfig::default()
    }
}

fn adapter(kind: Kind, runner: Arc<MockRunner>, regions: &[&str]) -> AwsAdapter {
    let config = config(regions);
    let cli = Arc::new(AwsCli::new(runner, &config));
    AwsAdapter::new(kind, cli, config.regions)
}

#[tokio::test]
async fn test_ec2_fetch_covers_every_region() {
    let runner = Arc::new(MockRunner::new().answer(
        "ec2 describe-instances",
        json!({"Reservations": [{
            "Instances": [{"InstanceId": "i-0001", "InstanceType": "t2.micro"}]
        }]}),
    ));

    let data = adapter(Kind::Ec2, Arc::clone(&runner), &["us-east-1", "eu-west-1"])
        .fetch()
        .await
        .unwrap();

    assert_eq!(data.len(), 1);
    let calls = runner.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    let profile = ["--profile".to_string(), "audit".to_string()];
    assert!(calls.iter().all(|argv| argv.ends_with(&profile)));
    assert!(calls.iter().any(|argv| argv.contains(&"eu-west-1".to_string())));
}

#[tokio::test]
async fn test_failed_call_maps_to_command_error() {
    let runner = Arc::new(MockRunner::new().fail("rds describe-db-instances", "AccessDenied"));

    let err = adapter(Kind::Rds, runner, &["us-east-1"])
        .fetch()
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::Command(ref msg) if msg.contains("AccessDenied")));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_s3_fetch_reads_acls() {
    let runner = Arc::new(
        MockRunner::new()
            .answer("s3api list-buckets", json!({"Buckets": [{"Name": "assets"}]}))
            .answer(
                "s3api get-bucket-acl",
                json!({"Grants": [{
                    "Grantee": {"URI": "http://acs.amazonaws.com/groups/global/AllUsers"},
                    "Permission": "READ"
                }]}),
            ),
    );

    let data = adapter(Kind::S3, runner, &["us-east-1"]).fetch().await.unwrap();

    assert_eq!(
        data["s3-assets"]["permissions"],
        json!({"read": "public", "write": "private"})
    );
}

#[tokio::test]
async fn test_iam_groups_resolve_members() {
    let runner = Arc::new(
        MockRunner::new()
            .answer("iam list-groups", json!({"Groups": [{"GroupName": "Ops"}]}))
            .answer("iam get-group", json!({"Users": [{"UserName": "Carol"}]}))
            .answer("iam list-attached-group-policies", json!({"AttachedPolicies": []}))
            .answer("iam list-group-policies", json!({"PolicyNames": []})),
    );

    let data = adapter(Kind::IamGroups, runner, &["us-east-1"])
        .fetch()
        .await
        .unwrap();

    assert_eq!(data["iamg-ops"]["users"], json!(["iamu-carol"]));
}

#[tokio::test]
async fn test_user_kinds_are_not_served() {
    let runner = Arc::new(MockRunner::new());
    let err = adapter(Kind::Projects, runner, &["us-east-1"])
        .fetch()
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Unavailable(_)));
}

#[tokio::test]
async fn test_regional_kind_without_regions_is_unavailable() {
    let runner = Arc::new(MockRunner::new());

    let err = adapter(Kind::Ec2, Arc::clone(&runner), &[])
        .fetch()
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::Unavailable(_)));
    assert!(runner.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_response_is_not_an_empty_fetch() {
    let runner = Arc::new(MockRunner::new());

    let err = adapter(Kind::SecurityGroups, runner, &["us-east-1"])
        .fetch()
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::Parse(ref msg) if msg.contains("empty response")));
    assert!(!err.is_retryable());
}
