//! Row 단위 권한 정책 평가
//!
//! # 개요
//!
//! 테이블별로 등록된 선언형 정책(`using` / `with_check` predicate)으로
//! 행위자가 특정 Row를 읽거나 쓸 수 있는지 판정합니다.
//!
//! # 모듈 구조
//!
//! - `role`: 인증 결과 → 역할 판별
//! - `expr` / `syntax`: predicate 트리와 텍스트 문법
//! - `context`: predicate 평가 컨텍스트
//! - `policy`: 정책 정의와 선언형 문서
//! - `store`: 버전 관리되는 정책 저장소
//! - `engine`: 접근 판정
//! - `audit`: 감사 로그
//! - `provision`: 내장 포럼 정책 세트

mod audit;
mod context;
mod engine;
mod expr;
mod policy;
mod provision;
mod role;
mod store;
mod syntax;

pub use audit::{
    redact, AuditEvent, AuditRecord, AuditSink, JsonLinesAuditSink, MemoryAuditLog,
    TracingAuditSink,
};
pub use context::{Phase, Row, RowContext};
pub use engine::{AccessRequest, DecisionEngine, EngineConfig, Reason, Verdict};
pub use expr::{CompareOp, Expr, Operand, Pattern, RowRef};
pub use policy::{Command, Policy, PolicyDefinition, PolicyDocument, RoleList};
pub use provision::{forum_policies, provision, provision_forum, FORUM_POLICIES};
pub use role::{AuthResult, Role, RoleResolver};
pub use store::{
    GapKind, PolicyChange, PolicyRevision, PolicySet, PolicyStore, ProvisioningGap, RevokeOutcome,
};
pub use syntax::parse_expr;
