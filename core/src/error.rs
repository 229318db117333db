//! Error types for the Tableau REST API client.
//!
//! # Design
//! Two error surfaces exist. `Terror` is the error record the server itself
//! reports inside a `tsResponse` envelope; it is plain data and implements
//! `std::error::Error` so callers can bubble it up directly. `ApiError` is
//! what every `TableauClient` operation returns: it wraps a decoded `Terror`
//! when the server sent one, and otherwise carries the raw status and body.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An error reported by the server.
///
/// In XML the code is an attribute while summary and detail are child
/// elements: `<error code="401001"><summary>..</summary><detail>..</detail></error>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terror {
    #[serde(default, alias = "@code", skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

impl fmt::Display for Terror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Code:{}, Summary:{}, Detail:{}",
            self.code, self.summary, self.detail
        )
    }
}

impl std::error::Error for Terror {}

/// Body of a failed call: `<tsResponse><error .../></tsResponse>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Terror,
}

/// Errors returned by `TableauClient` build and parse methods.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server returned 404 without a decodable error body.
    #[error("resource not found")]
    NotFound,

    /// An authenticated request was built before sign-in succeeded.
    #[error("not signed in: no auth token available")]
    NotSignedIn,

    /// The server rejected the call and described why.
    #[error("server error (HTTP {status}): {error}")]
    Server { status: u16, error: Terror },

    /// The server returned an unexpected status with an opaque body.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A response body could not be decoded into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// The server-reported error record, if the server sent one.
    pub fn terror(&self) -> Option<&Terror> {
        match self {
            ApiError::Server { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terror_display_lists_all_fields() {
        let err = Terror {
            code: "1".to_string(),
            summary: "s".to_string(),
            detail: "d".to_string(),
        };
        assert_eq!(err.to_string(), "Code:1, Summary:s, Detail:d");
    }

    #[test]
    fn terror_display_keeps_empty_fields() {
        assert_eq!(Terror::default().to_string(), "Code:, Summary:, Detail:");
    }

    #[test]
    fn terror_is_a_std_error() {
        let boxed: Box<dyn std::error::Error> = Box::new(Terror {
            code: "404000".to_string(),
            ..Terror::default()
        });
        assert!(boxed.to_string().starts_with("Code:404000"));
    }

    #[test]
    fn server_error_display_includes_terror() {
        let err = ApiError::Server {
            status: 401,
            error: Terror {
                code: "401001".to_string(),
                summary: "Signin Error".to_string(),
                detail: "bad password".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "server error (HTTP 401): Code:401001, Summary:Signin Error, Detail:bad password"
        );
        assert_eq!(err.terror().map(|t| t.code.as_str()), Some("401001"));
    }

    #[test]
    fn terror_json_omits_empty_fields() {
        let json = serde_json::to_value(Terror {
            code: "9".to_string(),
            ..Terror::default()
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "code": "9" }));
    }

    #[test]
    fn non_server_errors_have_no_terror() {
        assert!(ApiError::NotFound.terror().is_none());
        assert!(ApiError::Http {
            status: 500,
            body: String::new()
        }
        .terror()
        .is_none());
    }
}
