//! Authentication boundary.
//!
//! Tokens are issued elsewhere; this service only resolves a bearer token
//! to a principal and checks its role. The token table is static and comes
//! from configuration as `token=role:user_id` entries separated by commas.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use catalog::UserId;
use tracing::debug;

use crate::error::{ApiError, ConfigError};
use crate::http::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Student,
    Instructor,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "instructor" => Ok(Role::Instructor),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => f.write_str("student"),
            Role::Instructor => f.write_str("instructor"),
        }
    }
}

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

/// Static bearer-token table
#[derive(Debug, Clone, Default)]
pub struct TokenAuthenticator {
    tokens: HashMap<String, Principal>,
}

impl TokenAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `token=role:user_id[,token=role:user_id...]`; blank input is an empty table
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let mut authenticator = Self::new();

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = |reason: String| ConfigError::InvalidValue {
                key: "AUTH_TOKENS".to_string(),
                reason,
            };

            let (token, grant) = entry
                .split_once('=')
                .ok_or_else(|| invalid(format!("entry '{entry}' has no '='")))?;
            let (role, user_id) = grant
                .split_once(':')
                .ok_or_else(|| invalid(format!("entry for '{}' has no ':'", token.trim())))?;

            let token = token.trim();
            let user_id = user_id.trim();
            if token.is_empty() || user_id.is_empty() {
                return Err(invalid(format!("entry '{entry}' is incomplete")));
            }

            authenticator = authenticator.with_token(
                token,
                Principal {
                    user_id: user_id.to_string(),
                    role: role.parse().map_err(invalid)?,
                },
            );
        }

        Ok(authenticator)
    }

    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }

    pub fn authenticate(&self, token: &str) -> Option<&Principal> {
        self.tokens.get(token)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized("no token"))?;

        let principal = state
            .authenticator
            .authenticate(token)
            .cloned()
            .ok_or(ApiError::Unauthorized("token failed"))?;

        debug!("Authenticated {} ({})", principal.user_id, principal.role);
        Ok(principal)
    }
}

/// A principal that is known to be a student
#[derive(Debug, Clone)]
pub struct Student(pub Principal);

impl FromRequestParts<AppState> for Student {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        match principal.role {
            Role::Student => Ok(Student(principal)),
            _ => Err(ApiError::Forbidden("Access restricted to students only")),
        }
    }
}
