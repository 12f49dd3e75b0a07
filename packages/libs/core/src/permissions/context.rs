//! predicate 평가 컨텍스트
//!
//! 표현식 평가에 필요한 값(행위자 ID, 기존 Row, 제안 Row)을 명시적으로 전달합니다.
//! 암묵적인 "현재 사용자" 전역 상태는 없습니다.

use std::collections::BTreeMap;

use serde_json::Value;

use super::expr::{Operand, RowRef};

/// Row 데이터 (필드 이름 -> JSON 값)
pub type Row = BTreeMap<String, Value>;

/// 평가 단계
///
/// 한정되지 않은 필드 참조가 어느 Row를 읽는지 결정합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `using` predicate: 기존 Row의 가시성/자격
    Visibility,

    /// `with_check` predicate: 제안된 Row 내용
    Check,
}

/// predicate 평가 컨텍스트
///
/// # 사용 가능한 값
///
/// - `actor_id()`: 요청 행위자 ID (익명이면 없음)
/// - `existing.<field>`: 현재 저장된 Row (read/update/delete)
/// - `proposed.<field>`: 쓰려는 Row (create/update)
/// - `<field>`: 단계에 따라 existing 또는 proposed
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    actor_id: Option<&'a str>,
    existing: Option<&'a Row>,
    proposed: Option<&'a Row>,
    phase: Phase,
}

impl<'a> RowContext<'a> {
    /// 새 컨텍스트 생성 (Visibility 단계)
    pub fn new(actor_id: Option<&'a str>) -> Self {
        Self {
            actor_id,
            existing: None,
            proposed: None,
            phase: Phase::Visibility,
        }
    }

    /// 기존 Row 설정
    pub fn with_existing(mut self, row: Option<&'a Row>) -> Self {
        self.existing = row;
        self
    }

    /// 제안 Row 설정
    pub fn with_proposed(mut self, row: Option<&'a Row>) -> Self {
        self.proposed = row;
        self
    }

    /// 평가 단계 전환
    pub fn in_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn actor_id(&self) -> Option<&'a str> {
        self.actor_id
    }

    /// 피연산자 값 조회
    ///
    /// Row나 필드가 없으면 `None`이며, 평가기는 이를 NULL(unknown)로 취급합니다.
    pub fn resolve(&self, operand: &Operand) -> Option<Value> {
        match operand {
            Operand::Literal(value) => Some(value.clone()),
            Operand::ActorId => self.actor_id.map(|id| Value::String(id.to_string())),
            Operand::Field { row, name } => {
                let source = match (row, self.phase) {
                    (RowRef::Existing, _) | (RowRef::Current, Phase::Visibility) => self.existing,
                    (RowRef::Proposed, _) | (RowRef::Current, Phase::Check) => self.proposed,
                };
                source.and_then(|r| r.get(name)).cloned()
            }
        }
    }
}
