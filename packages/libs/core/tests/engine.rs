//! 판정 엔진 통합 테스트
//!
//! 공개 API만으로 스키마 로드 → 정책 프로비저닝 → 판정 → 감사 기록 흐름을 검증합니다.

use std::sync::Arc;
use std::thread;

use rowgate_core::permissions::{
    provision_forum, AccessRequest, AuditEvent, AuthResult, Command, DecisionEngine,
    JsonLinesAuditSink, MemoryAuditLog, Policy, PolicyDocument, PolicyStore, Reason, Role, Row,
    Verdict,
};
use rowgate_core::schema::SchemaCatalog;
use rowgate_core::Error;
use serde_json::{json, Value};

fn row(value: Value) -> Row {
    serde_json::from_value(value).unwrap()
}

fn forum_engine() -> (DecisionEngine, Arc<MemoryAuditLog>) {
    let audit = Arc::new(MemoryAuditLog::new());
    let catalog = Arc::new(SchemaCatalog::forum().unwrap());
    let store = Arc::new(PolicyStore::new(catalog, audit.clone()));
    provision_forum(&store, "migration").unwrap();
    (DecisionEngine::new(store), audit)
}

fn reply(owner: &str, content: &str) -> Row {
    row(json!({
        "id": "r1",
        "discussion_id": "d1",
        "owner_id": owner,
        "content": content,
        "created_at": "2024-05-01T10:00:00Z"
    }))
}

#[test]
fn forum_owner_can_edit_own_reply_only() {
    let (engine, _) = forum_engine();

    let own = AccessRequest::update(
        Role::Authenticated,
        Some("u1"),
        "replies",
        reply("u1", "first"),
        reply("u1", "edited"),
    );
    assert_eq!(
        engine.decide(&own).unwrap(),
        Verdict::allow(vec!["replies_update_own".to_string()])
    );

    let foreign = AccessRequest::update(
        Role::Authenticated,
        Some("u2"),
        "replies",
        reply("u1", "first"),
        reply("u1", "hijacked"),
    );
    assert_eq!(
        engine.decide(&foreign).unwrap().reason,
        Reason::UsingConditionFailed
    );

    let empty = AccessRequest::update(
        Role::Authenticated,
        Some("u1"),
        "replies",
        reply("u1", "first"),
        reply("u1", ""),
    );
    assert_eq!(
        engine.decide(&empty).unwrap().reason,
        Reason::CheckConditionFailed
    );
}

#[test]
fn service_role_bypasses_every_table() {
    let (engine, _) = forum_engine();
    let auth = AuthResult::system("svc");

    for table in engine.store().catalog().table_names() {
        let request = AccessRequest::from_auth(&auth, table, Command::Delete)
            .with_existing(row(json!({"id": "x"})));
        let verdict = engine.decide(&request).unwrap();
        assert!(verdict.allowed, "{}", table);
        assert_eq!(verdict.reason, Reason::PrivilegedBypass);
        assert_eq!(verdict.matched_policies, vec![format!("{}_service_all", table)]);
    }
}

#[test]
fn decisions_are_audited_with_redaction() {
    let (engine, audit) = forum_engine();
    let before = audit.len();

    let account = row(json!({
        "id": "u1",
        "username": "alice",
        "email": "alice@example.com",
        "created_at": "2024-05-01T10:00:00Z"
    }));
    let request = AccessRequest::create(Role::Authenticated, Some("u1"), "accounts", account);
    assert!(engine.decide(&request).unwrap().allowed);

    let records = audit.records();
    assert_eq!(records.len(), before + 1);
    let last = records.last().unwrap();
    assert_eq!(last.actor_id.as_deref(), Some("u1"));
    match &last.event {
        AuditEvent::Decision {
            table,
            command,
            verdict,
            proposed_row,
            ..
        } => {
            assert_eq!(table, "accounts");
            assert_eq!(*command, Command::Create);
            assert!(verdict.allowed);
            let proposed = proposed_row.as_ref().unwrap();
            assert_eq!(proposed["email"], json!("[redacted]"));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn json_lines_audit_file() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let sink = Arc::new(JsonLinesAuditSink::new(file.reopen().unwrap()));
    let catalog = Arc::new(SchemaCatalog::forum().unwrap());
    let store = Arc::new(PolicyStore::new(catalog, sink));
    store
        .register(Policy::new("discussions", "public", Command::Read), "admin")
        .unwrap();
    let engine = DecisionEngine::new(store);

    let request = AccessRequest::read(
        Role::Anonymous,
        None,
        "discussions",
        row(json!({"id": "d1"})),
    );
    engine.decide(&request).unwrap();

    let content = std::fs::read_to_string(file.path()).unwrap();
    let events: Vec<Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "policy_changed");
    assert_eq!(events[0]["change"], "registered");
    assert_eq!(events[1]["event"], "decision");
    assert_eq!(events[1]["verdict"]["matched_policies"], json!(["public"]));
}

#[test]
fn custom_policy_document() {
    let yaml = r#"
policies:
  - table: discussions
    name: pinned_hidden
    command: read
    roles: public
    using: "!is_pinned || owner_id == actor_id()"
"#;
    let catalog = Arc::new(SchemaCatalog::forum().unwrap());
    let store = Arc::new(PolicyStore::new(catalog, Arc::new(MemoryAuditLog::new())));
    store
        .register_all(PolicyDocument::from_yaml(yaml).unwrap().compile().unwrap(), "admin")
        .unwrap();
    let engine = DecisionEngine::new(store);

    let pinned = row(json!({"id": "d1", "owner_id": "u1", "is_pinned": true}));
    let anon = AccessRequest::read(Role::Anonymous, None, "discussions", pinned.clone());
    assert!(!engine.decide(&anon).unwrap().allowed);

    let owner = AccessRequest::read(Role::Authenticated, Some("u1"), "discussions", pinned);
    assert!(engine.decide(&owner).unwrap().allowed);
}

#[test]
fn registration_rejects_unknown_fields() {
    let yaml = r#"
policies:
  - table: replies
    name: by_author
    command: read
    using: "author_id == actor_id()"
"#;
    let catalog = Arc::new(SchemaCatalog::forum().unwrap());
    let store = PolicyStore::new(catalog, Arc::new(MemoryAuditLog::new()));
    let policies = PolicyDocument::from_yaml(yaml).unwrap().compile().unwrap();
    let err = store.register_all(policies, "admin").unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }));
    assert!(store.list(None).unwrap().is_empty());
}

#[test]
fn concurrent_register_and_list_see_whole_policies() {
    let catalog = Arc::new(SchemaCatalog::forum().unwrap());
    let store = Arc::new(PolicyStore::new(catalog, Arc::new(MemoryAuditLog::new())));

    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            for i in 0..200 {
                let policy = Policy::new("discussions", format!("p{:03}", i), Command::Read)
                    .for_roles([Role::Authenticated])
                    .using(rowgate_core::permissions::Expr::owner_is_actor());
                store.register(policy, "admin").unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..200 {
                    let policies = store.list_applicable("discussions", Command::Read).unwrap();
                    // 스냅샷은 단조 증가하고, 모든 정책은 바인딩이 끝난 상태
                    assert!(policies.len() >= last);
                    last = policies.len();
                    for (i, policy) in policies.iter().enumerate() {
                        assert_eq!(policy.name, format!("p{:03}", i));
                        assert_eq!(policy.using.to_string(), "owner_id == actor_id()");
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(
        store.list_applicable("discussions", Command::Read).unwrap().len(),
        200
    );
}

#[test]
fn concurrent_decisions() {
    let (engine, _) = forum_engine();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            thread::spawn(move || {
                let actor = format!("u{}", i % 2);
                let request = AccessRequest::delete(
                    Role::Authenticated,
                    Some(&actor),
                    "replies",
                    reply("u0", "hello"),
                );
                engine.decide(&request).unwrap().allowed == (i % 2 == 0)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
