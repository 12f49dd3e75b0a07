//! 공통 에러 타입
//!
//! 거부(deny)는 에러가 아닙니다. 거부 사유는 `Verdict`의 `Reason`으로 전달되고,
//! 여기에는 호출자 계약 위반, 관리 작업 실패, 내부 오류만 정의합니다.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Rowgate 공통 에러
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────────
    // Request Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Policy Store Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("duplicate policy name: '{name}' already exists on table '{table}'")]
    DuplicateName { table: String, name: String },

    #[error("schema mismatch in policy '{policy}' on table '{table}': {message}")]
    SchemaMismatch {
        table: String,
        policy: String,
        message: String,
    },

    #[error("policy not found: '{name}' on table '{table}'")]
    PolicyNotFound { table: String, name: String },

    #[error("unknown table: {name}")]
    UnknownTable { name: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Provisioning Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("schema parse error: {message}")]
    SchemaParse { message: String },

    #[error("policy parse error: {message}")]
    PolicyParse { message: String },

    #[error("expression parse error at offset {offset}: {message}")]
    ExprParse { offset: usize, message: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("internal error: {message}")]
    Internal { message: String },

    // ─────────────────────────────────────────────────────────────────────────────
    // Serialization Errors
    // ─────────────────────────────────────────────────────────────────────────────
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest {
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// 에러 코드 (로그/모니터링용)
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidRequest { .. } => "INVALID_REQUEST",
            Error::DuplicateName { .. } => "DUPLICATE_NAME",
            Error::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Error::PolicyNotFound { .. } => "POLICY_NOT_FOUND",
            Error::UnknownTable { .. } => "UNKNOWN_TABLE",
            Error::SchemaParse { .. } => "SCHEMA_PARSE_ERROR",
            Error::PolicyParse { .. } => "POLICY_PARSE_ERROR",
            Error::ExprParse { .. } => "EXPR_PARSE_ERROR",
            Error::Internal { .. } => "INTERNAL_ERROR",
            Error::Yaml(_) => "YAML_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }
    }

    /// 관리 작업(정책 등록/교체) 실패 여부
    pub fn is_administrative(&self) -> bool {
        matches!(
            self,
            Error::DuplicateName { .. }
                | Error::SchemaMismatch { .. }
                | Error::PolicyNotFound { .. }
                | Error::UnknownTable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::invalid_request("x").code(), "INVALID_REQUEST");
        assert_eq!(Error::internal("x").code(), "INTERNAL_ERROR");
        assert!(Error::DuplicateName {
            table: "accounts".to_string(),
            name: "p".to_string(),
        }
        .is_administrative());
        assert!(!Error::invalid_request("x").is_administrative());
    }
}
