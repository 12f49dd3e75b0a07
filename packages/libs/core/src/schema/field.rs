//! 필드 정의
//!
//! 테이블 필드의 메타데이터를 정의합니다.

use serde::{Deserialize, Serialize};

use super::types::FieldType;

/// 민감 필드 이름 prefix (`s_phone` 등)
const SENSITIVE_PREFIX: &str = "s_";

/// 필드 정의
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// 필드 이름
    pub name: String,

    /// 필드 타입
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// NULL 허용 여부
    #[serde(default)]
    pub nullable: bool,

    /// 민감 필드 (감사 로그에서 값이 가려짐)
    #[serde(default)]
    pub sensitive: bool,
}

impl Field {
    /// NOT NULL 필드 생성
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            sensitive: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// 감사 로그 마스킹 대상 여부
    ///
    /// 명시적 `sensitive` 또는 `s_` prefix 규칙을 따릅니다.
    pub fn is_sensitive(&self) -> bool {
        self.sensitive || self.name.starts_with(SENSITIVE_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_detection() {
        assert!(!Field::new("email", FieldType::String).is_sensitive());
        assert!(Field::new("email", FieldType::String).sensitive().is_sensitive());
        assert!(Field::new("s_phone", FieldType::String).is_sensitive());
    }
}
