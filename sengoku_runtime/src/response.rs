//! Uniform result envelope for outer surfaces.
//!
//! `{"success": true, "data": ..}` or
//! `{"success": false, "error": {"kind": .., "message": .., "detail": ..}}`.

use serde::Serialize;
use serde_json::Value;

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> Response<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                kind: kind.into(),
                message: message.into(),
                detail: None,
            }),
        }
    }

    pub fn from_result(result: Result<T, SessionError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::from(&err),
        }
    }
}

impl<T> From<&SessionError> for Response<T> {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::Rejected(e) => Self {
                success: false,
                data: None,
                error: Some(ErrorBody {
                    kind: e.kind().as_str().to_string(),
                    message: e.to_string(),
                    detail: serde_json::to_value(e).ok(),
                }),
            },
            SessionError::Runtime(e) => Self::failure("internal", e.to_string()),
        }
    }
}
