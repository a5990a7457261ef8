//! Turns a plain-language infrastructure request into a [`RawRequest`].
//!
//! The completion is only trusted to produce JSON in roughly the right
//! shape. Everything it returns still goes through descriptor validation.

use serde_json::{Map, Value};
use tracing::{debug, info};
use xpf_spec::{RawRequest, SecurityFlag};

use crate::error::{ChatError, ChatResult};
use crate::llm::CompletionClient;

/// Instructions sent with every request.
pub const SYSTEM_PROMPT: &str = r#"You translate infrastructure requests into JSON for a Crossplane manifest generator.

Respond with a single JSON object, or a JSON array of objects when several resources are requested. Fields:

- "resource_type": one of "eks", "s3", "rds", "vpc" (map "kubernetes cluster" to eks, "bucket" or "storage" to s3, "database", "postgres" or "mysql" to rds, "network" to vpc)
- "name": lowercase resource name using letters, digits and hyphens
- "environment": "dev", "staging" or "production"
- "region": AWS region such as "us-east-1"
- "size": "small", "medium" or "large"
- "node_count": integer, EKS only
- "kubernetes_version": string such as "1.27", EKS only
- "engine": "mysql" or "postgres", RDS only
- "allocated_storage": storage in GiB, RDS only
- "cidr_block": IPv4 CIDR, VPC only
- "security": list of "encrypted", "private", "public", "highly-available"
- "tags": object of string tags
- "description": one sentence summarizing the request

Omit any field the request does not mention. Do not invent values. Return JSON only."#;

/// Returns the JSON text inside a completion, unwrapping markdown fences.
pub fn extract_json(content: &str) -> ChatResult<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ChatError::EmptyCompletion);
    }

    if let Ok(re) = regex::Regex::new(r"(?s)```(?:json)?\s*\n?(.*?)```") {
        if let Some(inner) = re.captures(trimmed).and_then(|c| c.get(1)) {
            let inner = inner.as_str().trim();
            if !inner.is_empty() {
                return Ok(inner);
            }
        }
    }

    let start = trimmed.find(['{', '[']);
    let end = trimmed.rfind(['}', ']']);
    match (start, end) {
        (Some(start), Some(end)) if end > start => Ok(&trimmed[start..=end]),
        _ => Err(ChatError::InvalidCompletion(
            "no JSON object in completion".to_string(),
        )),
    }
}

/// Converts one JSON object from a completion into a [`RawRequest`].
///
/// Models often answer with booleans (`"encryption": true`) or numbers
/// where strings are expected; those are folded into the request shape
/// before deserializing.
pub fn coerce(value: Value) -> ChatResult<RawRequest> {
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(ChatError::InvalidCompletion(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
    };

    let mut fields = Map::new();
    let mut security: Vec<String> = Vec::new();

    for (key, value) in map {
        if value.is_null() {
            continue;
        }
        match key.as_str() {
            "security" | "security_flags" => match value {
                Value::Array(items) => security.extend(items.iter().filter_map(scalar_string)),
                other => security.extend(scalar_string(&other)),
            },
            "encryption" | "encrypted" => {
                push_if_true(&mut security, &value, SecurityFlag::Encrypted)
            }
            "private" => push_if_true(&mut security, &value, SecurityFlag::Private),
            "public" => push_if_true(&mut security, &value, SecurityFlag::Public),
            "versioning" | "highly_available" | "multi_az" => {
                push_if_true(&mut security, &value, SecurityFlag::HighlyAvailable)
            }
            "instance_class" | "instance_types" | "instance_type" => {
                debug!("Ignoring '{}' from completion; sizing comes from policy", key);
            }
            "kubernetes_version" | "kubernetesVersion" | "cidr_block" | "environment"
            | "region" | "size" | "engine" | "name" | "description" => {
                if let Some(text) = scalar_string(&value) {
                    fields.insert(key.clone(), Value::String(text));
                }
            }
            "tags" => {
                if let Value::Object(tags) = value {
                    let tags: Map<String, Value> = tags
                        .into_iter()
                        .filter_map(|(k, v)| scalar_string(&v).map(|s| (k, Value::String(s))))
                        .collect();
                    fields.insert(key.clone(), Value::Object(tags));
                }
            }
            _ => {
                fields.insert(key.clone(), value);
            }
        }
    }

    security.dedup();
    fields.insert(
        "security".to_string(),
        Value::Array(security.into_iter().map(Value::String).collect()),
    );

    serde_json::from_value(Value::Object(fields))
        .map_err(|e| ChatError::InvalidCompletion(e.to_string()))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn push_if_true(security: &mut Vec<String>, value: &Value, flag: SecurityFlag) {
    if value.as_bool() == Some(true) {
        security.push(flag.as_str().to_string());
    }
}

/// Parses free text into requests using a completion client.
pub struct RequestParser<C: CompletionClient> {
    client: C,
}

impl<C: CompletionClient> RequestParser<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Parse text describing exactly one resource.
    pub async fn parse(&self, text: &str) -> ChatResult<RawRequest> {
        let mut requests = self.parse_stack(text).await?;
        match requests.len() {
            1 => Ok(requests.remove(0)),
            n => Err(ChatError::InvalidCompletion(format!(
                "expected one resource, got {}",
                n
            ))),
        }
    }

    /// Parse text that may describe several resources.
    pub async fn parse_stack(&self, text: &str) -> ChatResult<Vec<RawRequest>> {
        let completion = self.client.complete(SYSTEM_PROMPT, text).await?;
        let requests = Self::parse_completion(&completion)?;
        info!("Parsed {} resource request(s) from text", requests.len());
        Ok(requests)
    }

    /// Interpret a completion that has already been fetched.
    pub fn parse_completion(completion: &str) -> ChatResult<Vec<RawRequest>> {
        let json = extract_json(completion)?;
        let value: Value = serde_json::from_str(json)?;

        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("resources") {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    map.insert("resources".to_string(), other);
                    vec![Value::Object(map)]
                }
                None => vec![Value::Object(map)],
            },
            other => {
                return Err(ChatError::InvalidCompletion(format!(
                    "expected a JSON object, got {}",
                    other
                )))
            }
        };

        if items.is_empty() {
            return Err(ChatError::EmptyCompletion);
        }
        items.into_iter().map(coerce).collect()
    }
}
