//! 접근 판정 엔진
//!
//! # 판정 순서
//!
//! 1. 요청 검증 (계약 위반은 `Error::InvalidRequest`, 거부가 아님)
//! 2. `privileged`: `USING (true)` 우회 정책이 있으면 즉시 허용
//! 3. 역할에 적용되는 정책이 없으면 기본 거부
//! 4. permissive 정책은 OR, restrictive 정책은 AND로 결합
//! 5. 결과를 감사 로그에 기록 (민감 필드는 가려짐)
//!
//! 평가 중 내부 오류는 항상 거부 쪽으로 닫힙니다.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::audit::{emit, redact, AuditEvent, AuditRecord, AuditSink};
use super::context::{Phase, Row, RowContext};
use super::policy::{Command, Policy};
use super::role::{AuthResult, Role, RoleResolver};
use super::store::PolicyStore;
use crate::error::{Error, Result};
use crate::schema::TableSchema;

// ─────────────────────────────────────────────────────────────────────────────
// Request / Verdict
// ─────────────────────────────────────────────────────────────────────────────

/// 접근 요청
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRequest {
    /// 행위자 ID (익명이면 None)
    #[serde(default)]
    pub actor_id: Option<String>,

    pub role: Role,
    pub table: String,
    pub command: Command,

    /// 현재 저장된 Row (read/update/delete)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_row: Option<Row>,

    /// 쓰려는 Row (create/update)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_row: Option<Row>,
}

impl AccessRequest {
    fn base(role: Role, actor_id: Option<&str>, table: &str, command: Command) -> Self {
        Self {
            actor_id: actor_id.map(str::to_string),
            role,
            table: table.to_string(),
            command,
            existing_row: None,
            proposed_row: None,
        }
    }

    pub fn read(role: Role, actor_id: Option<&str>, table: &str, existing: Row) -> Self {
        Self::base(role, actor_id, table, Command::Read).with_existing(existing)
    }

    pub fn create(role: Role, actor_id: Option<&str>, table: &str, proposed: Row) -> Self {
        Self::base(role, actor_id, table, Command::Create).with_proposed(proposed)
    }

    pub fn update(
        role: Role,
        actor_id: Option<&str>,
        table: &str,
        existing: Row,
        proposed: Row,
    ) -> Self {
        Self::base(role, actor_id, table, Command::Update)
            .with_existing(existing)
            .with_proposed(proposed)
    }

    pub fn delete(role: Role, actor_id: Option<&str>, table: &str, existing: Row) -> Self {
        Self::base(role, actor_id, table, Command::Delete).with_existing(existing)
    }

    /// 인증 결과로부터 요청 생성 (Row는 별도 설정)
    pub fn from_auth(auth: &AuthResult, table: &str, command: Command) -> Self {
        let (role, actor_id) = RoleResolver::resolve_actor(auth);
        Self::base(role, actor_id.as_deref(), table, command)
    }

    pub fn with_existing(mut self, row: Row) -> Self {
        self.existing_row = Some(row);
        self
    }

    pub fn with_proposed(mut self, row: Row) -> Self {
        self.proposed_row = Some(row);
        self
    }
}

/// 판정 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// permissive 정책 하나 이상 통과
    Allowed,

    /// 특권 우회 정책으로 허용
    PrivilegedBypass,

    /// 역할에 적용되는 정책 없음 (기본 거부)
    NoApplicablePolicy,

    /// 기존 Row가 어떤 정책의 `using`도 통과하지 못함
    UsingConditionFailed,

    /// 가시성은 통과했으나 제안 Row 내용이 `with_check`를 통과하지 못함
    CheckConditionFailed,

    /// restrictive 정책 불통과
    RestrictiveConditionFailed,

    /// 평가 중 내부 오류 (정책에 의한 거부가 아님)
    InternalError,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Allowed => "allowed",
            Reason::PrivilegedBypass => "privileged_bypass",
            Reason::NoApplicablePolicy => "no_applicable_policy",
            Reason::UsingConditionFailed => "using_condition_failed",
            Reason::CheckConditionFailed => "check_condition_failed",
            Reason::RestrictiveConditionFailed => "restrictive_condition_failed",
            Reason::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 판정 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub allowed: bool,

    /// 전체 게이트를 통과한 permissive 정책 이름 (등록 순서)
    pub matched_policies: Vec<String>,

    pub reason: Reason,
}

impl Verdict {
    pub fn allow(matched_policies: Vec<String>) -> Self {
        Self {
            allowed: true,
            matched_policies,
            reason: Reason::Allowed,
        }
    }

    pub fn bypass(policy: &str) -> Self {
        Self {
            allowed: true,
            matched_policies: vec![policy.to_string()],
            reason: Reason::PrivilegedBypass,
        }
    }

    pub fn deny(reason: Reason) -> Self {
        Self {
            allowed: false,
            matched_policies: Vec::new(),
            reason,
        }
    }

    pub fn internal_error() -> Self {
        Self::deny(Reason::InternalError)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// 엔진 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 감사 로그에서 민감 필드 값을 대체할 문자열
    #[serde(default = "default_redaction_marker")]
    pub redaction_marker: String,

    /// read 판정도 감사 로그에 기록할지
    #[serde(default = "default_audit_reads")]
    pub audit_reads: bool,
}

fn default_redaction_marker() -> String {
    "[redacted]".to_string()
}

fn default_audit_reads() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            redaction_marker: default_redaction_marker(),
            audit_reads: default_audit_reads(),
        }
    }
}

/// 정책 하나의 게이트 결과
#[derive(Debug, Clone, Copy)]
struct Gate {
    /// 기존 Row 가시성 (`using`)
    visible: bool,

    /// 제안 Row 내용 (`with_check` 또는 `using`)
    checked: bool,
}

impl Gate {
    fn passed(&self) -> bool {
        self.visible && self.checked
    }
}

/// 접근 판정 엔진
///
/// `Send + Sync`이며 `decide`는 조정 없이 동시에 호출할 수 있습니다.
pub struct DecisionEngine {
    store: Arc<PolicyStore>,
    audit: Arc<dyn AuditSink>,
    config: EngineConfig,
}

impl DecisionEngine {
    /// 저장소의 감사 sink를 공유하는 엔진 생성
    pub fn new(store: Arc<PolicyStore>) -> Self {
        let audit = store.audit_sink().clone();
        Self {
            store,
            audit,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 접근 판정
    ///
    /// 거부는 `Ok(Verdict { allowed: false, .. })`입니다. `Err`는 잘못된 요청
    /// (`InvalidRequest`) 또는 내부 오류(`Internal`)일 때만 반환됩니다.
    pub fn decide(&self, request: &AccessRequest) -> Result<Verdict> {
        let table = match self.validate(request) {
            Ok(table) => table,
            Err(e) => {
                tracing::debug!(
                    table = %request.table,
                    command = %request.command,
                    error = %e,
                    "Rejected malformed access request"
                );
                return Err(e);
            }
        };

        match self.evaluate(request) {
            Ok(verdict) => {
                tracing::debug!(
                    table = %request.table,
                    command = %request.command,
                    role = %request.role,
                    allowed = verdict.allowed,
                    reason = %verdict.reason,
                    matched = ?verdict.matched_policies,
                    "Access decided"
                );
                self.record(request, table, &verdict);
                Ok(verdict)
            }
            Err(e) => {
                tracing::error!(
                    table = %request.table,
                    command = %request.command,
                    role = %request.role,
                    error = %e,
                    "Access evaluation failed; denying"
                );
                self.record(request, table, &Verdict::internal_error());
                Err(match e {
                    Error::Internal { .. } => e,
                    other => Error::internal(other.to_string()),
                })
            }
        }
    }

    /// 요청 계약 검증
    fn validate(&self, request: &AccessRequest) -> Result<&TableSchema> {
        if request.command == Command::Any {
            return Err(Error::invalid_request(
                "command 'any' is only valid in policy definitions",
            ));
        }

        let table = self
            .store
            .catalog()
            .get_table(&request.table)
            .ok_or_else(|| Error::invalid_request(format!("unknown table '{}'", request.table)))?;

        match (request.role, request.actor_id.as_deref()) {
            (Role::Anonymous, Some(_)) => {
                return Err(Error::invalid_request(
                    "anonymous requests must not carry an actor id",
                ))
            }
            (Role::Authenticated | Role::Privileged, None) => {
                return Err(Error::invalid_request(format!(
                    "{} requests require an actor id",
                    request.role
                )))
            }
            (_, Some("")) => return Err(Error::invalid_request("actor id must not be empty")),
            _ => {}
        }

        let command = request.command;
        match (&request.existing_row, command.reads_existing()) {
            (None, true) => {
                return Err(Error::invalid_request(format!(
                    "existing_row is required for {}",
                    command
                )))
            }
            (Some(_), false) => {
                return Err(Error::invalid_request(format!(
                    "existing_row must be absent for {}",
                    command
                )))
            }
            (Some(row), true) => validate_row(table, "existing_row", row)?,
            (None, false) => {}
        }
        match (&request.proposed_row, command.writes_proposed()) {
            (None, true) => {
                return Err(Error::invalid_request(format!(
                    "proposed_row is required for {}",
                    command
                )))
            }
            (Some(_), false) => {
                return Err(Error::invalid_request(format!(
                    "proposed_row must be absent for {}",
                    command
                )))
            }
            (Some(row), true) => validate_row(table, "proposed_row", row)?,
            (None, false) => {}
        }

        Ok(table)
    }

    /// 정책 결합
    fn evaluate(&self, request: &AccessRequest) -> Result<Verdict> {
        let command = request.command;
        let policies = self.store.list_applicable(&request.table, command)?;

        if let Some(foreign) = policies.iter().find(|p| p.table != request.table) {
            return Err(Error::internal(format!(
                "policy '{}' of table '{}' returned for table '{}'",
                foreign.name, foreign.table, request.table
            )));
        }

        if request.role.is_privileged() {
            if let Some(bypass) = policies.iter().find(|p| p.is_bypass()) {
                return Ok(Verdict::bypass(&bypass.name));
            }

            tracing::warn!(
                table = %request.table,
                command = %command,
                "Privileged actor has no bypass policy; falling back to ordinary evaluation"
            );
            emit(
                self.audit.as_ref(),
                AuditRecord::new(
                    request.actor_id.clone(),
                    AuditEvent::PrivilegedBypassMissing {
                        table: request.table.clone(),
                        command,
                    },
                ),
            );
        }

        let (permissive, restrictive): (Vec<&Arc<Policy>>, Vec<&Arc<Policy>>) = policies
            .iter()
            .filter(|p| p.applies_to(request.role))
            .partition(|p| p.permissive);

        // restrictive 정책만으로는 아무것도 허용할 수 없음
        if permissive.is_empty() {
            return Ok(Verdict::deny(Reason::NoApplicablePolicy));
        }

        let ctx = RowContext::new(request.actor_id.as_deref())
            .with_existing(request.existing_row.as_ref())
            .with_proposed(request.proposed_row.as_ref());

        let mut matched = Vec::new();
        let mut any_visible = false;
        for policy in &permissive {
            let result = gate(policy, command, &ctx);
            any_visible |= result.visible;
            if result.passed() {
                matched.push(policy.name.clone());
            }
        }

        if matched.is_empty() {
            let reason = if any_visible {
                Reason::CheckConditionFailed
            } else {
                Reason::UsingConditionFailed
            };
            return Ok(Verdict::deny(reason));
        }

        if let Some(failed) = restrictive
            .iter()
            .find(|policy| !gate(policy, command, &ctx).passed())
        {
            tracing::debug!(policy = %failed.name, "Restrictive policy failed");
            return Ok(Verdict {
                allowed: false,
                matched_policies: matched,
                reason: Reason::RestrictiveConditionFailed,
            });
        }

        Ok(Verdict::allow(matched))
    }

    /// 감사 기록 (실패해도 판정에 영향 없음)
    fn record(&self, request: &AccessRequest, table: &TableSchema, verdict: &Verdict) {
        if request.command == Command::Read
            && !self.config.audit_reads
            && verdict.reason != Reason::InternalError
        {
            return;
        }

        let marker = self.config.redaction_marker.as_str();
        let event = AuditEvent::Decision {
            table: request.table.clone(),
            command: request.command,
            role: request.role,
            verdict: verdict.clone(),
            existing_row: request
                .existing_row
                .as_ref()
                .map(|row| redact(row, table, marker)),
            proposed_row: request
                .proposed_row
                .as_ref()
                .map(|row| redact(row, table, marker)),
        };
        emit(
            self.audit.as_ref(),
            AuditRecord::new(request.actor_id.clone(), event),
        );
    }
}

/// 정책 하나의 전체 게이트 평가
///
/// - read/delete: `using(existing)`
/// - update: `using(existing) AND check(proposed)`
/// - create: `check(proposed)`
fn gate(policy: &Policy, command: Command, ctx: &RowContext<'_>) -> Gate {
    let visible = !command.reads_existing()
        || policy
            .using
            .evaluate(&ctx.in_phase(Phase::Visibility));
    let checked = !command.writes_proposed()
        || policy
            .check_predicate()
            .evaluate(&ctx.in_phase(Phase::Check));
    Gate { visible, checked }
}

/// Row 필드가 선언되어 있고 타입이 맞는지 검사
fn validate_row(table: &TableSchema, label: &str, row: &Row) -> Result<()> {
    for (name, value) in row {
        let field = table.find_field(name).ok_or_else(|| {
            Error::invalid_request(format!(
                "{} has unknown field '{}' for table '{}'",
                label, name, table.name
            ))
        })?;

        if value.is_null() {
            if !field.nullable {
                return Err(Error::invalid_request(format!(
                    "{} field '{}' is not nullable",
                    label, name
                )));
            }
            continue;
        }

        if !field.field_type.accepts(value) {
            return Err(Error::invalid_request(format!(
                "{} field '{}' expects {}, got {}",
                label, name, field.field_type, value
            )));
        }
    }
    Ok(())
}
