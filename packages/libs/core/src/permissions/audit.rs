//! 감사 로그
//!
//! 판정 결과와 정책 변경을 append-only 레코드로 외부 저장소에 남깁니다.
//! 판정 엔진 입장에서 기록은 fire-and-forget입니다. 기록 실패는 별도로 경고될 뿐
//! 판정 결과를 바꾸지 않습니다.

use std::io::Write;
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::context::Row;
use super::engine::Verdict;
use super::policy::Command;
use super::role::Role;
use super::store::PolicyChange;
use crate::error::{Error, Result};
use crate::schema::TableSchema;

/// 감사 레코드
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    /// 레코드 ID (ULID)
    pub id: String,

    pub timestamp: DateTime<Utc>,

    /// 행위자 ID (판정 요청자 또는 정책 변경 관리자)
    pub actor_id: Option<String>,

    #[serde(flatten)]
    pub event: AuditEvent,
}

impl AuditRecord {
    pub fn new(actor_id: Option<String>, event: AuditEvent) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            timestamp: Utc::now(),
            actor_id,
            event,
        }
    }
}

/// 감사 이벤트
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// 접근 판정 (민감 필드 값은 가려짐)
    Decision {
        table: String,
        command: Command,
        role: Role,
        verdict: Verdict,
        #[serde(skip_serializing_if = "Option::is_none")]
        existing_row: Option<Row>,
        #[serde(skip_serializing_if = "Option::is_none")]
        proposed_row: Option<Row>,
    },

    /// 정책 등록/교체/철회
    PolicyChanged {
        table: String,
        name: String,
        change: PolicyChange,
        version: u64,
    },

    /// 특권 행위자가 우회 정책이 없는 테이블/명령에 접근 (프로비저닝 누락 경고)
    PrivilegedBypassMissing { table: String, command: Command },
}

/// 감사 로그 저장소
pub trait AuditSink: Send + Sync {
    fn append(&self, record: &AuditRecord) -> Result<()>;
}

/// 레코드 기록 (실패는 경고만 남김)
pub(crate) fn emit(sink: &dyn AuditSink, record: AuditRecord) {
    if let Err(e) = sink.append(&record) {
        tracing::warn!(
            record_id = %record.id,
            error = %e,
            "Failed to append audit record"
        );
    }
}

/// 민감 필드 값 마스킹
pub fn redact(row: &Row, table: &TableSchema, marker: &str) -> Row {
    row.iter()
        .map(|(name, value)| {
            let sensitive = table.find_field(name).map_or(false, |f| f.is_sensitive());
            let value = if sensitive && !value.is_null() {
                serde_json::Value::String(marker.to_string())
            } else {
                value.clone()
            };
            (name.clone(), value)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Sinks
// ─────────────────────────────────────────────────────────────────────────────

/// 메모리 감사 로그 (테스트/임베딩용)
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 기록된 레코드 복사본
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, record: &AuditRecord) -> Result<()> {
        self.records
            .write()
            .map_err(|_| Error::internal("audit log lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}

/// `tracing` 이벤트로 내보내는 sink
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn append(&self, record: &AuditRecord) -> Result<()> {
        let payload = serde_json::to_string(&record.event)?;
        match &record.event {
            AuditEvent::PrivilegedBypassMissing { .. } => tracing::warn!(
                target: "rowgate::audit",
                id = %record.id,
                actor_id = record.actor_id.as_deref().unwrap_or("-"),
                event = %payload,
                "audit record"
            ),
            _ => tracing::info!(
                target: "rowgate::audit",
                id = %record.id,
                actor_id = record.actor_id.as_deref().unwrap_or("-"),
                event = %payload,
                "audit record"
            ),
        }
        Ok(())
    }
}

/// JSON Lines 형식으로 writer에 기록하는 sink
pub struct JsonLinesAuditSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesAuditSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// writer 회수
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| Error::internal("audit writer lock poisoned"))
    }
}

impl<W: Write + Send> AuditSink for JsonLinesAuditSink<W> {
    fn append(&self, record: &AuditRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::internal("audit writer lock poisoned"))?;
        writer
            .write_all(&line)
            .and_then(|_| writer.flush())
            .map_err(|e| Error::internal(format!("audit write failed: {}", e)))
    }
}
