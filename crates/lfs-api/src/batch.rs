//! Batch API wire types.
//!
//! Request and response bodies of `POST <api>/objects/batch`, plus the small
//! bodies used by the basic transfer adapter's verify step.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Media type of batch API requests and responses.
pub const MEDIA_TYPE: &str = "application/vnd.git-lfs+json";

/// Batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Download,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upload" => Some(Self::Upload),
            "download" => Some(Self::Download),
            _ => None,
        }
    }
}

/// An object reference: content id plus size in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub oid: String,
    pub size: i64,
}

/// Body of a batch request.
///
/// `operation` is kept as a string so servers (and negative tests) can carry
/// values outside [`Operation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub operation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfers: Vec<String>,
    pub objects: Vec<ObjectSpec>,
}

impl BatchRequest {
    pub fn new(operation: Operation, objects: Vec<ObjectSpec>) -> Self {
        Self {
            operation: operation.as_str().to_string(),
            transfers: vec!["basic".to_string()],
            objects,
        }
    }
}

/// Body of a successful batch response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<String>,
    #[serde(default)]
    pub objects: Vec<ObjectResponse>,
}

impl BatchResponse {
    /// Find the entry for `oid`.
    pub fn object(&self, oid: &str) -> Option<&ObjectResponse> {
        self.objects.iter().find(|o| o.oid == oid)
    }
}

/// Per-object entry of a batch response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectResponse {
    pub oid: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Actions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ObjectError>,
}

impl ObjectResponse {
    /// The action the server offers for `operation`, if any.
    pub fn action(&self, operation: Operation) -> Option<&Action> {
        let actions = self.actions.as_ref()?;
        match operation {
            Operation::Upload => actions.upload.as_ref(),
            Operation::Download => actions.download.as_ref(),
        }
    }

    pub fn verify_action(&self) -> Option<&Action> {
        self.actions.as_ref()?.verify.as_ref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Actions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<Action>,
}

/// A transfer action: where to send the request and which headers to add.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Action {
    pub href: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub header: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl Action {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }
}

/// Object-level error inside a batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectError {
    pub code: u16,
    pub message: String,
}

/// Body of a request-level error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = BatchRequest::new(
            Operation::Upload,
            vec![ObjectSpec {
                oid: "abc".into(),
                size: 12,
            }],
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "operation": "upload",
                "transfers": ["basic"],
                "objects": [{"oid": "abc", "size": 12}],
            })
        );
    }

    #[test]
    fn test_response_with_actions_and_errors() {
        let body = r#"{
            "transfer": "basic",
            "objects": [
                {
                    "oid": "aaa",
                    "size": 10,
                    "authenticated": true,
                    "actions": {
                        "upload": {"href": "https://x/aaa", "header": {"Authorization": "t"}, "expires_in": 3600},
                        "verify": {"href": "https://x/verify"}
                    }
                },
                {"oid": "bbb", "size": 20},
                {"oid": "ccc", "size": 30, "error": {"code": 404, "message": "not found"}}
            ]
        }"#;
        let response: BatchResponse = serde_json::from_str(body).unwrap();

        let a = response.object("aaa").unwrap();
        let upload = a.action(Operation::Upload).unwrap();
        assert_eq!(upload.href, "https://x/aaa");
        assert_eq!(upload.header.get("Authorization").map(String::as_str), Some("t"));
        assert!(a.action(Operation::Download).is_none());
        assert!(a.verify_action().is_some());

        let b = response.object("bbb").unwrap();
        assert!(b.actions.is_none());
        assert!(b.error.is_none());

        let c = response.object("ccc").unwrap();
        assert_eq!(c.error.as_ref().map(|e| e.code), Some(404));
        assert!(response.object("ddd").is_none());
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::parse("upload"), Some(Operation::Upload));
        assert_eq!(Operation::parse(Operation::Download.as_str()), Some(Operation::Download));
        assert_eq!(Operation::parse("delete"), None);
    }
}
