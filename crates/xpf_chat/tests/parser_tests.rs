//! Completion handling against realistic model output.

use async_trait::async_trait;
use xpf_chat::{ChatError, ChatResult, CompletionClient, RequestParser};
use xpf_spec::{DescriptorValidator, ResourceKind, SecurityFlag};

/// Replays a fixed completion.
struct Canned(&'static str);

#[async_trait]
impl CompletionClient for Canned {
    async fn complete(&self, _system: &str, _user: &str) -> ChatResult<String> {
        Ok(self.0.to_string())
    }
}

#[tokio::test]
async fn test_bucket_request_validates() {
    let parser = RequestParser::new(Canned(
        r#"{"resource_type": "s3", "name": "backup-storage", "environment": "prod",
            "encryption": true, "versioning": true, "tags": {"team": "ops"}}"#,
    ));

    let raw = parser
        .parse("Create an encrypted S3 bucket for production backups with versioning")
        .await
        .unwrap();
    let descriptor = DescriptorValidator::validate(&raw).unwrap();

    assert_eq!(descriptor.kind(), ResourceKind::S3);
    assert!(descriptor.has_flag(SecurityFlag::Encrypted));
    assert!(descriptor.has_flag(SecurityFlag::HighlyAvailable));
}

#[tokio::test]
async fn test_stack_request() {
    let parser = RequestParser::new(Canned(
        "```json\n[\
         {\"resource_type\": \"vpc\", \"name\": \"shop-net\", \"cidr_block\": \"10.1.0.0/16\"},\
         {\"resource_type\": \"database\", \"name\": \"shop-db\", \"engine\": \"postgres\", \"allocated_storage\": 50}\
         ]\n```",
    ));

    let requests = parser.parse_stack("network and a postgres db for the shop").await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].cidr_block.as_deref(), Some("10.1.0.0/16"));
    assert_eq!(requests[1].allocated_storage, Some(50));
}

#[tokio::test]
async fn test_prose_completion_is_rejected() {
    let parser = RequestParser::new(Canned("Which region should the cluster run in?"));
    let err = parser.parse("a cluster").await.unwrap_err();
    assert!(matches!(err, ChatError::InvalidCompletion(_)));
}
