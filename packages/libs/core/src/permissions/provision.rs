//! 정책 프로비저닝
//!
//! 선언형 정책 문서를 컴파일하여 저장소에 등록합니다. 등록 후 누락 검사 결과를
//! 로그로 남깁니다.

use super::policy::{Policy, PolicyDocument};
use super::store::{GapKind, PolicyStore};
use crate::error::Result;

/// 내장 forum 정책 문서
pub const FORUM_POLICIES: &str = include_str!("../../policies/forum.yaml");

/// 내장 forum 정책 컴파일
pub fn forum_policies() -> Result<Vec<Policy>> {
    PolicyDocument::from_yaml(FORUM_POLICIES)?.compile()
}

/// 정책 문서를 저장소에 등록
///
/// 문서 전체를 먼저 컴파일하므로 문법 오류가 있으면 아무것도 등록되지 않습니다.
/// 등록 순서는 문서 순서를 따릅니다.
pub fn provision(store: &PolicyStore, document: &PolicyDocument, actor: &str) -> Result<usize> {
    let policies = document.compile()?;
    let count = store.register_all(policies, actor)?;

    for gap in store.lint()? {
        match gap.kind {
            GapKind::PrivilegedBypassMissing => tracing::warn!(
                table = %gap.table,
                command = %gap.command,
                "No privileged bypass policy"
            ),
            GapKind::UnreachableForNonPrivileged => tracing::debug!(
                table = %gap.table,
                command = %gap.command,
                "Command unreachable for non-privileged roles"
            ),
        }
    }

    tracing::info!(count, actor = %actor, "Policies provisioned");
    Ok(count)
}

/// 내장 forum 정책 등록
pub fn provision_forum(store: &PolicyStore, actor: &str) -> Result<usize> {
    provision(store, &PolicyDocument::from_yaml(FORUM_POLICIES)?, actor)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::permissions::audit::MemoryAuditLog;
    use crate::permissions::context::Row;
    use crate::permissions::engine::{AccessRequest, DecisionEngine, Reason};
    use crate::permissions::policy::Command;
    use crate::permissions::role::Role;
    use crate::permissions::store::ProvisioningGap;
    use crate::schema::SchemaCatalog;

    fn engine() -> DecisionEngine {
        let catalog = Arc::new(SchemaCatalog::forum().unwrap());
        let store = Arc::new(PolicyStore::new(catalog, Arc::new(MemoryAuditLog::new())));
        provision_forum(&store, "migration").unwrap();
        DecisionEngine::new(store)
    }

    fn row(value: Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_forum_policies_compile_and_bind() {
        let policies = forum_policies().unwrap();
        assert_eq!(policies.len(), 22);

        let catalog = Arc::new(SchemaCatalog::forum().unwrap());
        let store = PolicyStore::new(catalog, Arc::new(MemoryAuditLog::new()));
        assert_eq!(provision_forum(&store, "migration").unwrap(), 22);
        assert_eq!(store.version().unwrap(), 22);
    }

    #[test]
    fn test_forum_lint_only_reports_intentional_gaps() {
        let engine = engine();
        let gaps = engine.store().lint().unwrap();

        assert!(!gaps.iter().any(|g| g.kind == GapKind::PrivilegedBypassMissing));

        let mut unreachable: Vec<(String, Command)> = gaps
            .into_iter()
            .map(|ProvisioningGap { table, command, .. }| (table, command))
            .collect();
        unreachable.sort();
        assert_eq!(
            unreachable,
            vec![
                ("accounts".to_string(), Command::Delete),
                ("discussion_likes".to_string(), Command::Update),
                ("reply_likes".to_string(), Command::Update),
            ]
        );
    }

    #[test]
    fn test_discussion_title_validation() {
        let engine = engine();
        let draft = |title: &str| {
            row(json!({
                "id": "d1",
                "owner_id": "u1",
                "title": title,
                "content": "body",
                "is_pinned": false,
                "created_at": "2024-05-01T10:00:00Z"
            }))
        };

        let ok = AccessRequest::create(
            Role::Authenticated,
            Some("u1"),
            "discussions",
            draft("Hello"),
        );
        let verdict = engine.decide(&ok).unwrap();
        assert!(verdict.allowed);
        assert_eq!(verdict.matched_policies, vec!["discussions_insert_own"]);

        let short = AccessRequest::create(
            Role::Authenticated,
            Some("u1"),
            "discussions",
            draft("Hi"),
        );
        assert_eq!(
            engine.decide(&short).unwrap().reason,
            Reason::CheckConditionFailed
        );
    }

    #[test]
    fn test_account_username_pattern() {
        let engine = engine();
        let account = |username: &str| {
            row(json!({
                "id": "u1",
                "username": username,
                "display_name": null,
                "created_at": "2024-05-01T10:00:00Z"
            }))
        };

        let ok = AccessRequest::create(
            Role::Authenticated,
            Some("u1"),
            "accounts",
            account("alice_01"),
        );
        assert!(engine.decide(&ok).unwrap().allowed);

        let bad = AccessRequest::create(
            Role::Authenticated,
            Some("u1"),
            "accounts",
            account("a b"),
        );
        assert!(!engine.decide(&bad).unwrap().allowed);
    }

    #[test]
    fn test_likes_are_immutable_and_owner_deletable() {
        let engine = engine();
        let like = |owner: &str| {
            row(json!({
                "id": "l1",
                "discussion_id": "d1",
                "owner_id": owner,
                "created_at": "2024-05-01T10:00:00Z"
            }))
        };

        let update = AccessRequest::update(
            Role::Authenticated,
            Some("u1"),
            "discussion_likes",
            like("u1"),
            like("u1"),
        );
        assert_eq!(
            engine.decide(&update).unwrap().reason,
            Reason::NoApplicablePolicy
        );

        let own = AccessRequest::delete(
            Role::Authenticated,
            Some("u1"),
            "discussion_likes",
            like("u1"),
        );
        assert!(engine.decide(&own).unwrap().allowed);

        let other = AccessRequest::delete(
            Role::Authenticated,
            Some("u1"),
            "discussion_likes",
            like("u2"),
        );
        assert_eq!(
            engine.decide(&other).unwrap().reason,
            Reason::UsingConditionFailed
        );
    }

    #[test]
    fn test_anonymous_reads_everything_writes_nothing() {
        let engine = engine();
        let reply = row(json!({
            "id": "r1",
            "discussion_id": "d1",
            "owner_id": "u1",
            "content": "hi"
        }));

        let read = AccessRequest::read(Role::Anonymous, None, "replies", reply.clone());
        assert_eq!(
            engine.decide(&read).unwrap().matched_policies,
            vec!["replies_select_public"]
        );

        let create = AccessRequest::create(Role::Anonymous, None, "replies", reply);
        assert_eq!(
            engine.decide(&create).unwrap().reason,
            Reason::NoApplicablePolicy
        );
    }
}
