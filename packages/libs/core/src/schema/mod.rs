//! 테이블 스키마 카탈로그
//!
//! # 개요
//!
//! 정책 predicate는 등록 시점에 테이블 스키마와 대조하여 검증됩니다.
//! 이 모듈은 그 기준이 되는 테이블/필드 정의와 YAML 파서를 제공합니다.
//!
//! # 모듈 구조
//!
//! - `types`: 논리적 필드 타입 (string, int, float, boolean, timestamp, json)
//! - `field`: 필드 정의
//! - `table`: 테이블 정의 (식별 필드, 소유자 필드)
//! - `catalog`: 테이블 카탈로그 (내장 forum 스키마 포함)
//! - `parser`: YAML 파싱 로직

mod catalog;
mod field;
mod parser;
mod table;
mod types;

pub use catalog::SchemaCatalog;
pub use field::Field;
pub use parser::SchemaParser;
pub use table::{TableSchema, OWNER_ALIAS};
pub use types::FieldType;
