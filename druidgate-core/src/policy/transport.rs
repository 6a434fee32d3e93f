//! Transport guard: gates raw HTTP requests towards Druid.
//!
//! In read-only mode only `GET` requests and SQL query submissions
//! (`POST /druid/v2/sql`, trailing slashes ignored) are let through. Denials
//! carry HTTP 405.

use std::fmt;

use http::{Method, StatusCode};
use thiserror::Error;

use super::state::PolicyState;

/// The only path accepting `POST` in read-only mode.
pub const SQL_QUERY_PATH: &str = "/druid/v2/sql";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// `POST` below the SQL path, e.g. `/druid/v2/sql/statements`.
    SqlSubPath,
    /// Any other non-`GET` request.
    MethodNotAllowed,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SqlSubPath => f.write_str(
                "POST is only allowed on the SQL endpoint itself, not on its sub-paths",
            ),
            Self::MethodNotAllowed => {
                f.write_str("Only GET requests and SQL queries are allowed in read-only mode")
            }
        }
    }
}

/// A request refused by the [`TransportGuard`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{reason}. Request: {method} {path}. Allowed: GET, POST {allowed}",
    allowed = SQL_QUERY_PATH
)]
pub struct TransportDenied {
    pub reason: DenialReason,
    pub method: Method,
    pub path: String,
}

impl TransportDenied {
    /// Always 405 Method Not Allowed.
    pub fn status(&self) -> u16 {
        self.status_code().as_u16()
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::METHOD_NOT_ALLOWED
    }
}

/// Method/path gate for the raw HTTP surface and for outbound engine calls.
#[derive(Debug, Clone, Copy)]
pub struct TransportGuard {
    state: PolicyState,
}

impl TransportGuard {
    pub fn new(state: PolicyState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> PolicyState {
        self.state
    }

    /// Allow or deny a request by method and path (no query string).
    pub fn check(&self, method: &Method, path: &str) -> Result<(), TransportDenied> {
        if !self.state.is_enabled() || method == Method::GET {
            return Ok(());
        }

        let reason = if method == Method::POST {
            let normalized = path.trim_end_matches('/');
            if normalized == SQL_QUERY_PATH {
                return Ok(());
            }
            if is_sub_path(normalized) {
                DenialReason::SqlSubPath
            } else {
                DenialReason::MethodNotAllowed
            }
        } else {
            DenialReason::MethodNotAllowed
        };

        Err(TransportDenied {
            reason,
            method: method.clone(),
            path: path.to_string(),
        })
    }
}

fn is_sub_path(normalized: &str) -> bool {
    normalized
        .strip_prefix(SQL_QUERY_PATH)
        .is_some_and(|rest| rest.starts_with('/'))
}
