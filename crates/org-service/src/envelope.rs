//! Response envelopes.
//!
//! Every dispatched operation returns the same wrapper: a status, a
//! human-readable message, a timestamp and either a `data` payload or a
//! stable `error_code`. Listing operations add a pagination block inside
//! `data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ServiceError;
use crate::pagination::PageInfo;

/// Outcome marker on a response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The operation completed.
    Success,
    /// The operation failed; `error_code` is set.
    Error,
}

/// Envelope returned by every operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Success or error.
    pub status: ResponseStatus,

    /// Human-readable outcome description.
    pub message: String,

    /// When the response was produced.
    pub timestamp: DateTime<Utc>,

    /// Stable machine-readable code, present on errors only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// Operation result payload, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Structured error detail, when the failure carries one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Response {
    /// Build a success envelope with a data payload.
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            timestamp: Utc::now(),
            error_code: None,
            data: Some(data),
            details: None,
        }
    }

    /// Build an error envelope from a service error.
    pub fn error(err: &ServiceError) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: err.to_string(),
            timestamp: Utc::now(),
            error_code: Some(err.error_code().to_string()),
            data: None,
            details: err.details(),
        }
    }

    /// Build a success envelope for a listing operation.
    pub fn paged(message: impl Into<String>, items: Vec<Value>, page: PageInfo) -> Self {
        Self::success(
            message,
            json!({
                "items": items,
                "pagination": page,
            }),
        )
    }

    /// Whether this envelope reports success.
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let response = Response::success("organization retrieved", json!({"org_id": "org_1"}));
        assert!(response.is_success());

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["org_id"], "org_1");
        assert!(value.get("error_code").is_none());
        assert!(value.get("details").is_none());
    }

    #[test]
    fn test_error_envelope_shape() {
        let err = ServiceError::NotFound("organization 'org_1' not found".into());
        let response = Response::error(&err);
        assert!(!response.is_success());

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error_code"], "NOT_FOUND");
        assert_eq!(value["message"], "organization 'org_1' not found");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_paged_envelope_shape() {
        let page = PageInfo {
            current_page: 1,
            total_pages: 3,
            total_count: 41,
            limit: 20,
            has_next: true,
            has_prev: false,
        };
        let response = Response::paged("organizations listed", vec![json!({"org_id": "a"})], page);

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["items"].as_array().unwrap().len(), 1);
        assert_eq!(value["data"]["pagination"]["total_count"], 41);
        assert_eq!(value["data"]["pagination"]["has_next"], true);
    }
}
