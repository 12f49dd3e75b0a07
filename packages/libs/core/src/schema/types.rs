//! 논리적 필드 타입 정의
//!
//! 정책 엔진은 저장소 엔진과 무관한 논리 타입만 다룹니다.
//! Row 값은 JSON으로 전달되므로 각 타입은 허용하는 JSON 형태를 정의합니다.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 논리적 필드 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// 문자열
    String,

    /// 64비트 정수
    Int,

    /// 64비트 부동소수점
    Float,

    /// 불리언
    Boolean,

    /// 타임스탬프 (JSON: RFC 3339 string)
    Timestamp,

    /// 임의 JSON (비교 불가)
    Json,
}

impl FieldType {
    /// 타입 문자열에서 파싱
    pub fn from_simple_str(s: &str) -> Option<Self> {
        match s {
            "string" | "text" | "uuid" => Some(FieldType::String),
            "int" | "integer" | "bigint" => Some(FieldType::Int),
            "float" | "double" => Some(FieldType::Float),
            "boolean" | "bool" => Some(FieldType::Boolean),
            "timestamp" | "timestamptz" => Some(FieldType::Timestamp),
            "json" | "jsonb" => Some(FieldType::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamp",
            FieldType::Json => "json",
        }
    }

    /// 문자열 연산(length, matches) 대상 여부
    pub fn is_textual(&self) -> bool {
        matches!(self, FieldType::String | FieldType::Timestamp)
    }

    /// 대소 비교(<, <=, >, >=) 가능 여부
    pub fn is_orderable(&self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::Int | FieldType::Float | FieldType::Timestamp
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }

    /// 두 타입의 값끼리 비교할 수 있는지
    pub fn comparable_with(&self, other: FieldType) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return true;
        }
        if self.is_textual() && other.is_textual() {
            return true;
        }
        *self == other && *self != FieldType::Json
    }

    /// JSON 값이 이 타입에 맞는지 검사 (null은 호출자가 nullable로 판단)
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Timestamp => value
                .as_str()
                .map(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
                .unwrap_or(false),
            FieldType::Json => true,
        }
    }

    /// 리터럴 JSON 값의 타입 추론
    pub fn of_literal(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(FieldType::String),
            Value::Bool(_) => Some(FieldType::Boolean),
            Value::Number(n) if n.is_f64() => Some(FieldType::Float),
            Value::Number(_) => Some(FieldType::Int),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_type_parsing() {
        assert_eq!(FieldType::from_simple_str("string"), Some(FieldType::String));
        assert_eq!(FieldType::from_simple_str("uuid"), Some(FieldType::String));
        assert_eq!(FieldType::from_simple_str("bigint"), Some(FieldType::Int));
        assert_eq!(FieldType::from_simple_str("bool"), Some(FieldType::Boolean));
        assert_eq!(FieldType::from_simple_str("unknown"), None);
    }

    #[test]
    fn test_accepts_json_values() {
        assert!(FieldType::String.accepts(&json!("hello")));
        assert!(!FieldType::String.accepts(&json!(1)));
        assert!(FieldType::Int.accepts(&json!(42)));
        assert!(!FieldType::Int.accepts(&json!(4.2)));
        assert!(FieldType::Float.accepts(&json!(4)));
        assert!(FieldType::Timestamp.accepts(&json!("2024-05-01T10:00:00Z")));
        assert!(!FieldType::Timestamp.accepts(&json!("yesterday")));
        assert!(FieldType::Json.accepts(&json!({"a": [1, 2]})));
    }

    #[test]
    fn test_comparability() {
        assert!(FieldType::Int.comparable_with(FieldType::Float));
        assert!(FieldType::String.comparable_with(FieldType::Timestamp));
        assert!(!FieldType::String.comparable_with(FieldType::Int));
        assert!(!FieldType::Json.comparable_with(FieldType::Json));
        assert!(!FieldType::Boolean.is_orderable());
    }
}
