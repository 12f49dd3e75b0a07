//! 스키마 YAML 파서
//!
//! 스키마 YAML을 파싱하여 `SchemaCatalog`로 변환합니다.

use std::collections::HashMap;

use serde::Deserialize;

use super::catalog::SchemaCatalog;
use super::field::Field;
use super::table::TableSchema;
use super::types::FieldType;
use crate::error::{Error, Result};

/// 스키마 파서
pub struct SchemaParser;

impl SchemaParser {
    /// 단일 YAML 문자열 파싱
    pub fn parse_yaml(yaml: &str) -> Result<SchemaCatalog> {
        let raw: RawSchema = serde_yaml::from_str(yaml)?;
        Self::convert_raw_schema(raw)
    }

    /// Raw 스키마를 카탈로그로 변환
    fn convert_raw_schema(raw: RawSchema) -> Result<SchemaCatalog> {
        let mut catalog = SchemaCatalog::new();
        catalog.version = raw.version;

        for (name, raw_table) in raw.tables {
            let table = Self::convert_raw_table(name, raw_table)?;
            catalog.add_table(table);
        }

        Ok(catalog)
    }

    /// Raw 테이블을 TableSchema로 변환
    fn convert_raw_table(name: String, raw: RawTable) -> Result<TableSchema> {
        let fields = Self::convert_raw_fields(&name, raw.fields)?;
        let id_field = raw.id.unwrap_or_else(|| "id".to_string());

        if !fields.iter().any(|f| f.name == id_field) {
            return Err(Error::SchemaParse {
                message: format!(
                    "table '{}' declares id field '{}' which is not a field",
                    name, id_field
                ),
            });
        }

        if let Some(owner) = &raw.owner {
            if !fields.iter().any(|f| &f.name == owner) {
                return Err(Error::SchemaParse {
                    message: format!(
                        "table '{}' declares owner field '{}' which is not a field",
                        name, owner
                    ),
                });
            }
        }

        Ok(TableSchema {
            name,
            id_field,
            owner_field: raw.owner,
            fields,
        })
    }

    /// Raw 필드들 변환
    fn convert_raw_fields(table: &str, raw: HashMap<String, RawField>) -> Result<Vec<Field>> {
        let mut fields = Vec::with_capacity(raw.len());

        for (name, raw_field) in raw {
            let type_str = raw_field.field_type.as_deref().unwrap_or("string");
            let field_type = FieldType::from_simple_str(type_str).ok_or_else(|| Error::SchemaParse {
                message: format!("invalid type '{}' for field '{}.{}'", type_str, table, name),
            })?;

            fields.push(Field {
                name,
                field_type,
                nullable: raw_field.nullable.unwrap_or(false),
                sensitive: raw_field.sensitive.unwrap_or(false),
            });
        }

        // 이름순 정렬 (일관성)
        fields.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(fields)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw YAML 구조체 (serde 역직렬화용)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawSchema {
    #[serde(default = "default_version")]
    version: u32,
    tables: HashMap<String, RawTable>,
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct RawTable {
    id: Option<String>,
    owner: Option<String>,
    fields: HashMap<String, RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    #[serde(rename = "type")]
    field_type: Option<String>,
    nullable: Option<bool>,
    sensitive: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_schema() {
        let yaml = r#"
version: 1
tables:
  posts:
    owner: author_id
    fields:
      id: { type: uuid }
      author_id: { type: uuid }
      title: { type: string }
      body: { type: string, nullable: true }
"#;

        let catalog = SchemaParser::parse_yaml(yaml).unwrap();
        let posts = catalog.get_table("posts").unwrap();

        assert_eq!(posts.id_field, "id");
        assert_eq!(posts.owner_field.as_deref(), Some("author_id"));
        assert_eq!(posts.fields.len(), 4);
        assert_eq!(posts.fields[0].name, "author_id");
        assert!(posts.find_field("body").unwrap().nullable);
    }

    #[test]
    fn test_unknown_owner_field_rejected() {
        let yaml = r#"
tables:
  posts:
    owner: user_id
    fields:
      id: { type: string }
"#;

        let err = SchemaParser::parse_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::SchemaParse { .. }));
    }

    #[test]
    fn test_invalid_field_type_rejected() {
        let yaml = r#"
tables:
  posts:
    fields:
      id: { type: blob }
"#;

        let err = SchemaParser::parse_yaml(yaml).unwrap_err();
        assert_eq!(err.code(), "SCHEMA_PARSE_ERROR");
    }
}
