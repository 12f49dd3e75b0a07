//! 스키마 카탈로그
//!
//! 정책 저장소와 판정 엔진이 공유하는 테이블 정의의 집합입니다.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::parser::SchemaParser;
use super::table::TableSchema;
use crate::error::Result;

/// 내장 forum 스키마 (accounts, discussions, replies, discussion_likes, reply_likes)
const FORUM_SCHEMA: &str = include_str!("../../schema/forum.yaml");

/// 스키마 카탈로그
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaCatalog {
    /// 스키마 버전 (YAML의 version 필드)
    pub version: u32,

    /// 테이블 맵 (테이블 이름 -> 테이블 정의)
    pub tables: HashMap<String, TableSchema>,
}

impl SchemaCatalog {
    /// 빈 카탈로그 생성
    pub fn new() -> Self {
        Self {
            version: 1,
            tables: HashMap::new(),
        }
    }

    /// 내장 forum 스키마 로드
    pub fn forum() -> Result<Self> {
        SchemaParser::parse_yaml(FORUM_SCHEMA)
    }

    /// 테이블 추가
    pub fn add_table(&mut self, table: TableSchema) {
        self.tables.insert(table.name.clone(), table);
    }

    /// 테이블 조회
    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// 테이블 존재 여부
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// 모든 테이블 이름 (이름순)
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
