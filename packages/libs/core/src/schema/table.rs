//! 테이블 정의

use serde::{Deserialize, Serialize};

use super::field::Field;

/// predicate에서 테이블의 소유자 필드를 가리키는 이름
///
/// `accounts`처럼 식별 필드 자체가 소유자인 테이블에서도 `owner_id`로 쓸 수 있습니다.
pub const OWNER_ALIAS: &str = "owner_id";

/// 테이블 스키마
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// 테이블 이름
    pub name: String,

    /// 식별 필드 이름
    pub id_field: String,

    /// 소유자 필드 이름 (소유 개념이 없는 테이블은 None)
    #[serde(default)]
    pub owner_field: Option<String>,

    /// 필드 목록 (이름순)
    pub fields: Vec<Field>,
}

impl TableSchema {
    /// 필드 조회
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.find_field(name).is_some()
    }

    /// predicate의 필드 이름 해석
    ///
    /// 실제 필드가 우선이고, 없으면 `owner_id`를 소유자 필드로 해석합니다.
    pub fn resolve_field(&self, name: &str) -> Option<&Field> {
        if let Some(field) = self.find_field(name) {
            return Some(field);
        }
        if name == OWNER_ALIAS {
            return self
                .owner_field
                .as_deref()
                .and_then(|owner| self.find_field(owner));
        }
        None
    }

    /// 민감 필드 이름 목록
    pub fn sensitive_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.is_sensitive())
            .map(|f| f.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn accounts() -> TableSchema {
        TableSchema {
            name: "accounts".to_string(),
            id_field: "id".to_string(),
            owner_field: Some("id".to_string()),
            fields: vec![
                Field::new("email", FieldType::String).sensitive(),
                Field::new("id", FieldType::String),
                Field::new("username", FieldType::String),
            ],
        }
    }

    #[test]
    fn test_owner_alias_resolution() {
        let table = accounts();
        assert_eq!(table.resolve_field("owner_id").unwrap().name, "id");
        assert_eq!(table.resolve_field("username").unwrap().name, "username");
        assert!(table.resolve_field("missing").is_none());
    }

    #[test]
    fn test_owner_alias_without_owner() {
        let mut table = accounts();
        table.owner_field = None;
        assert!(table.resolve_field("owner_id").is_none());
    }

    #[test]
    fn test_sensitive_fields() {
        let table = accounts();
        assert_eq!(table.sensitive_fields().collect::<Vec<_>>(), vec!["email"]);
    }
}
