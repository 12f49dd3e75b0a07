//! 정책 저장소
//!
//! 등록된 정책을 테이블별 불변 스냅샷(`Arc<[Arc<Policy>]>`)으로 보관합니다.
//! 변경 작업은 새 스냅샷을 만들어 쓰기 잠금 아래에서 통째로 교체하므로,
//! 조회자는 변경 전 또는 변경 후의 정책 집합만 관찰합니다.
//!
//! 모든 변경은 이전 정의를 보존한 개정 이력(`PolicyRevision`)과 감사 이벤트로 남습니다.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::audit::{emit, AuditEvent, AuditRecord, AuditSink};
use super::policy::{Command, Policy};
use super::role::Role;
use crate::error::{Error, Result};
use crate::schema::SchemaCatalog;

/// 테이블 하나의 정책 스냅샷 (등록 순서)
pub type PolicySet = Arc<[Arc<Policy>]>;

/// 정책 변경 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyChange {
    Registered,
    Replaced,
    Revoked,
}

/// 정책 개정 이력
#[derive(Debug, Clone, Serialize)]
pub struct PolicyRevision {
    /// 저장소 전체에서 단조 증가하는 버전
    pub version: u64,
    pub table: String,
    pub name: String,
    pub change: PolicyChange,

    /// 변경 전 정의 (등록이면 None)
    pub previous: Option<Arc<Policy>>,

    /// 변경 후 정의 (철회면 None)
    pub current: Option<Arc<Policy>>,

    /// 변경을 수행한 관리자
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// 철회 결과
#[derive(Debug, Clone, PartialEq)]
pub enum RevokeOutcome {
    /// 철회된 정의
    Revoked(Arc<Policy>),

    /// 해당 이름의 정책이 없음 (변경 없음)
    NotFound,
}

/// 프로비저닝 누락 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    /// 비특권 역할 누구도 이 명령을 수행할 수 없음 (의도된 설계일 수 있음)
    UnreachableForNonPrivileged,

    /// 특권 우회 정책 없음 (잠재적 잠금)
    PrivilegedBypassMissing,
}

/// 프로비저닝 누락 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningGap {
    pub table: String,
    pub command: Command,
    pub kind: GapKind,
}

#[derive(Default)]
struct StoreState {
    tables: HashMap<String, PolicySet>,
    history: Vec<PolicyRevision>,
    version: u64,
}

impl StoreState {
    fn snapshot(&self, table: &str) -> PolicySet {
        self.tables
            .get(table)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// 새 스냅샷으로 교체하고 개정 이력 추가
    fn commit(
        &mut self,
        table: &str,
        name: &str,
        next: Vec<Arc<Policy>>,
        change: PolicyChange,
        previous: Option<Arc<Policy>>,
        current: Option<Arc<Policy>>,
        actor: &str,
    ) -> u64 {
        self.tables.insert(table.to_string(), next.into());
        self.version += 1;
        self.history.push(PolicyRevision {
            version: self.version,
            table: table.to_string(),
            name: name.to_string(),
            change,
            previous,
            current,
            actor: actor.to_string(),
            at: Utc::now(),
        });
        self.version
    }
}

/// 정책 저장소
pub struct PolicyStore {
    catalog: Arc<SchemaCatalog>,
    audit: Arc<dyn AuditSink>,
    state: RwLock<StoreState>,
}

impl PolicyStore {
    /// 새 저장소 생성
    pub fn new(catalog: Arc<SchemaCatalog>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            catalog,
            audit,
            state: RwLock::new(StoreState::default()),
        }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn audit_sink(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| Error::internal("policy store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| Error::internal("policy store lock poisoned"))
    }

    /// 쓰기 잠금을 쥔 스레드가 패닉한 상태를 재현
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        std::thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = self.state.write();
                    panic!("writer panicked while holding the policy store lock");
                })
                .join();
        });
    }

    /// 스키마 검증 후 정규화된 정책 반환
    fn bind(&self, policy: &Policy) -> Result<Arc<Policy>> {
        let table = self
            .catalog
            .get_table(&policy.table)
            .ok_or_else(|| Error::UnknownTable {
                name: policy.table.clone(),
            })?;
        Ok(Arc::new(policy.bind(table)?))
    }

    fn announce(&self, actor: &str, table: &str, name: &str, change: PolicyChange, version: u64) {
        tracing::info!(
            table = %table,
            policy = %name,
            change = ?change,
            version,
            actor = %actor,
            "Policy store updated"
        );
        emit(
            self.audit.as_ref(),
            AuditRecord::new(
                Some(actor.to_string()),
                AuditEvent::PolicyChanged {
                    table: table.to_string(),
                    name: name.to_string(),
                    change,
                    version,
                },
            ),
        );
    }

    /// 정책 등록
    ///
    /// 같은 테이블에 같은 이름이 있으면 `DuplicateName`, predicate가 스키마와 맞지 않으면
    /// `SchemaMismatch`로 실패합니다.
    pub fn register(&self, policy: Policy, actor: &str) -> Result<Arc<Policy>> {
        let bound = self.bind(&policy)?;

        let version = {
            let mut state = self.write()?;
            let current = state.snapshot(&bound.table);
            if current.iter().any(|p| p.name == bound.name) {
                return Err(Error::DuplicateName {
                    table: bound.table.clone(),
                    name: bound.name.clone(),
                });
            }

            let mut next: Vec<Arc<Policy>> = current.iter().cloned().collect();
            next.push(bound.clone());
            state.commit(
                &bound.table,
                &bound.name,
                next,
                PolicyChange::Registered,
                None,
                Some(bound.clone()),
                actor,
            )
        };

        self.announce(actor, &bound.table, &bound.name, PolicyChange::Registered, version);
        Ok(bound)
    }

    /// 여러 정책을 순서대로 등록 (첫 실패에서 중단)
    pub fn register_all(
        &self,
        policies: impl IntoIterator<Item = Policy>,
        actor: &str,
    ) -> Result<usize> {
        let mut count = 0;
        for policy in policies {
            self.register(policy, actor)?;
            count += 1;
        }
        Ok(count)
    }

    /// 이름이 같은 정책의 정의를 교체 (등록 순서 위치 유지)
    ///
    /// 이전 정의를 반환합니다.
    pub fn replace(&self, policy: Policy, actor: &str) -> Result<Arc<Policy>> {
        let bound = self.bind(&policy)?;

        let (previous, version) = {
            let mut state = self.write()?;
            let current = state.snapshot(&bound.table);
            let index = current
                .iter()
                .position(|p| p.name == bound.name)
                .ok_or_else(|| Error::PolicyNotFound {
                    table: bound.table.clone(),
                    name: bound.name.clone(),
                })?;

            let previous = current[index].clone();
            let mut next: Vec<Arc<Policy>> = current.iter().cloned().collect();
            next[index] = bound.clone();
            let version = state.commit(
                &bound.table,
                &bound.name,
                next,
                PolicyChange::Replaced,
                Some(previous.clone()),
                Some(bound.clone()),
                actor,
            );
            (previous, version)
        };

        self.announce(actor, &bound.table, &bound.name, PolicyChange::Replaced, version);
        Ok(previous)
    }

    /// 정책 철회
    ///
    /// 없는 이름이면 아무것도 바꾸지 않고 `RevokeOutcome::NotFound`를 반환합니다.
    pub fn revoke(&self, table: &str, name: &str, actor: &str) -> Result<RevokeOutcome> {
        let (removed, version) = {
            let mut state = self.write()?;
            let current = state.snapshot(table);
            let Some(index) = current.iter().position(|p| p.name == name) else {
                tracing::debug!(table = %table, policy = %name, "Revoke of unknown policy ignored");
                return Ok(RevokeOutcome::NotFound);
            };

            let removed = current[index].clone();
            let next: Vec<Arc<Policy>> = current
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, p)| p.clone())
                .collect();
            let version = state.commit(
                table,
                name,
                next,
                PolicyChange::Revoked,
                Some(removed.clone()),
                None,
                actor,
            );
            (removed, version)
        };

        self.announce(actor, table, name, PolicyChange::Revoked, version);
        Ok(RevokeOutcome::Revoked(removed))
    }

    /// 테이블의 현재 정책 스냅샷
    pub fn snapshot(&self, table: &str) -> Result<PolicySet> {
        Ok(self.read()?.snapshot(table))
    }

    /// `(table, command)`에 적용되는 정책 (등록 순서)
    ///
    /// 명령이 정확히 같거나 `any`인 정책을 반환합니다.
    pub fn list_applicable(&self, table: &str, command: Command) -> Result<Vec<Arc<Policy>>> {
        let snapshot = self.snapshot(table)?;
        Ok(snapshot
            .iter()
            .filter(|p| p.command.covers(command))
            .cloned()
            .collect())
    }

    /// 정책 목록 (테이블 이름순, 테이블 내 등록 순서)
    pub fn list(&self, table: Option<&str>) -> Result<Vec<Arc<Policy>>> {
        let state = self.read()?;
        let mut names: Vec<&String> = state
            .tables
            .keys()
            .filter(|name| table.map_or(true, |t| t == name.as_str()))
            .collect();
        names.sort();

        Ok(names
            .into_iter()
            .flat_map(|name| state.tables[name].iter().cloned())
            .collect())
    }

    /// 특정 정책의 개정 이력 (오래된 순)
    pub fn history(&self, table: &str, name: &str) -> Result<Vec<PolicyRevision>> {
        Ok(self
            .read()?
            .history
            .iter()
            .filter(|r| r.table == table && r.name == name)
            .cloned()
            .collect())
    }

    /// 전체 개정 이력
    pub fn revisions(&self) -> Result<Vec<PolicyRevision>> {
        Ok(self.read()?.history.clone())
    }

    /// 현재 저장소 버전 (변경마다 1씩 증가)
    pub fn version(&self) -> Result<u64> {
        Ok(self.read()?.version)
    }

    /// 카탈로그의 모든 `(table, command)`에 대해 프로비저닝 누락 검사
    pub fn lint(&self) -> Result<Vec<ProvisioningGap>> {
        let mut gaps = Vec::new();

        for table in self.catalog.table_names() {
            let snapshot = self.snapshot(table)?;
            for command in Command::CONCRETE {
                let applicable: Vec<&Arc<Policy>> = snapshot
                    .iter()
                    .filter(|p| p.command.covers(command))
                    .collect();

                let reachable = applicable.iter().any(|p| {
                    p.permissive
                        && (p.applies_to(Role::Anonymous) || p.applies_to(Role::Authenticated))
                });
                if !reachable {
                    gaps.push(ProvisioningGap {
                        table: table.to_string(),
                        command,
                        kind: GapKind::UnreachableForNonPrivileged,
                    });
                }

                if !applicable.iter().any(|p| p.is_bypass()) {
                    gaps.push(ProvisioningGap {
                        table: table.to_string(),
                        command,
                        kind: GapKind::PrivilegedBypassMissing,
                    });
                }
            }
        }

        Ok(gaps)
    }
}
