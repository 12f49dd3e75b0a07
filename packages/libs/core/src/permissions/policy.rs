//! 권한 정책 정의
//!
//! 정책 하나는 `(table, command, roles)`에 적용되는 `using` / `with_check` predicate 쌍입니다.
//! 선언형 정의(`PolicyDefinition`)는 프로비저닝 시점에 `Policy`로 컴파일됩니다.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::expr::Expr;
use super::role::Role;
use super::syntax::parse_expr;
use crate::error::{Error, Result};
use crate::schema::TableSchema;

/// CRUD 명령 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    Create,
    Read,
    Update,
    Delete,

    /// 네 가지 명령 모두 (`FOR ALL`)
    Any,
}

impl Command {
    /// 요청에 쓰이는 구체 명령
    pub const CONCRETE: [Command; 4] = [
        Command::Create,
        Command::Read,
        Command::Update,
        Command::Delete,
    ];

    /// 문자열에서 파싱 (SQL 별칭 포함)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "create" | "insert" => Some(Command::Create),
            "read" | "select" => Some(Command::Read),
            "update" => Some(Command::Update),
            "delete" => Some(Command::Delete),
            "any" | "all" => Some(Command::Any),
            _ => None,
        }
    }

    /// 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Create => "create",
            Command::Read => "read",
            Command::Update => "update",
            Command::Delete => "delete",
            Command::Any => "any",
        }
    }

    /// 정책 명령이 요청 명령에 적용되는지
    pub fn covers(&self, requested: Command) -> bool {
        *self == Command::Any || *self == requested
    }

    /// 기존 Row 가시성(`using`)이 적용되는 명령
    pub fn reads_existing(&self) -> bool {
        matches!(self, Command::Read | Command::Update | Command::Delete)
    }

    /// 제안 Row 내용 검사(`with_check`)가 적용되는 명령
    pub fn writes_proposed(&self) -> bool {
        matches!(self, Command::Create | Command::Update)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Command {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Command::from_str(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown command '{}'", value)))
    }
}

/// 등록 가능한 정책
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    /// 대상 테이블
    pub table: String,

    /// 정책 이름 (테이블 내 유일)
    pub name: String,

    /// 적용 명령
    pub command: Command,

    /// 적용 역할
    pub roles: BTreeSet<Role>,

    /// permissive(OR 결합) / restrictive(AND 결합)
    pub permissive: bool,

    /// 기존 Row 가시성 조건
    pub using: Expr,

    /// 제안 Row 내용 조건 (None이면 `using` 재사용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_check: Option<Expr>,
}

impl Policy {
    /// 모든 역할에 적용되는 `USING (true)` permissive 정책 생성
    pub fn new(table: impl Into<String>, name: impl Into<String>, command: Command) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            command,
            roles: Role::ALL.into_iter().collect(),
            permissive: true,
            using: Expr::Const(true),
            with_check: None,
        }
    }

    /// 적용 역할 지정
    pub fn for_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    /// restrictive 정책으로 전환
    pub fn restrictive(mut self) -> Self {
        self.permissive = false;
        self
    }

    pub fn using(mut self, expr: Expr) -> Self {
        self.using = expr;
        self
    }

    pub fn with_check(mut self, expr: Expr) -> Self {
        self.with_check = Some(expr);
        self
    }

    /// 역할 적용 여부
    pub fn applies_to(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// 제안 Row에 적용할 predicate
    pub fn check_predicate(&self) -> &Expr {
        self.with_check.as_ref().unwrap_or(&self.using)
    }

    /// 특권 우회 정책(`privileged` 대상 permissive, `USING (true)`)인지
    pub fn is_bypass(&self) -> bool {
        self.permissive && self.applies_to(Role::Privileged) && self.using.is_trivially_true()
    }

    /// 테이블 스키마에 대해 predicate를 검증하고 정규화된 정책 반환
    pub(crate) fn bind(&self, table: &TableSchema) -> Result<Policy> {
        let mismatch = |message: String| Error::SchemaMismatch {
            table: self.table.clone(),
            policy: self.name.clone(),
            message,
        };

        if self.roles.is_empty() {
            return Err(mismatch("policy applies to no roles".to_string()));
        }

        let using = self
            .using
            .bind(table)
            .map_err(|e| mismatch(format!("using: {}", e)))?;
        let with_check = self
            .with_check
            .as_ref()
            .map(|expr| expr.bind(table))
            .transpose()
            .map_err(|e| mismatch(format!("with_check: {}", e)))?;

        Ok(Policy {
            using,
            with_check,
            ..self.clone()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// 선언형 정의 (YAML/JSON)
// ─────────────────────────────────────────────────────────────────────────────

/// 정책 문서
///
/// 스키마 마이그레이션 등 외부 선언형 소스에서 로드됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub policies: Vec<PolicyDefinition>,
}

impl PolicyDocument {
    /// YAML 문자열 파싱
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// 모든 정의를 `Policy`로 컴파일 (정의 순서 유지)
    pub fn compile(&self) -> Result<Vec<Policy>> {
        self.policies.iter().map(PolicyDefinition::compile).collect()
    }
}

/// 정책 하나의 선언형 레코드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDefinition {
    pub table: String,
    pub name: String,
    pub command: Command,

    /// 적용 역할 (생략 시 모든 역할)
    #[serde(default)]
    pub roles: RoleList,

    #[serde(default = "default_permissive")]
    pub permissive: bool,

    /// `using` 조건 텍스트
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub using: Option<String>,

    /// `with_check` 조건 텍스트
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_check: Option<String>,
}

fn default_permissive() -> bool {
    true
}

impl PolicyDefinition {
    /// 텍스트 조건을 파싱하여 `Policy` 생성
    ///
    /// `using`이 없으면 `true`입니다 (insert 전용 정책).
    pub fn compile(&self) -> Result<Policy> {
        let parse = |clause: &str, source: &str| {
            parse_expr(source).map_err(|e| Error::PolicyParse {
                message: format!("{}.{} {}: {}", self.table, self.name, clause, e),
            })
        };

        if self.with_check.is_some()
            && !self.command.writes_proposed()
            && self.command != Command::Any
        {
            return Err(Error::PolicyParse {
                message: format!(
                    "{}.{}: with_check cannot be applied to {} policies",
                    self.table, self.name, self.command
                ),
            });
        }

        let using = match &self.using {
            Some(source) => parse("using", source)?,
            None => Expr::Const(true),
        };
        let with_check = self
            .with_check
            .as_deref()
            .map(|source| parse("with_check", source))
            .transpose()?;

        let roles = if self.roles.0.is_empty() {
            Role::ALL.into_iter().collect()
        } else {
            self.roles.0.clone()
        };

        Ok(Policy {
            table: self.table.clone(),
            name: self.name.clone(),
            command: self.command,
            roles,
            permissive: self.permissive,
            using,
            with_check,
        })
    }
}

/// 역할 목록 (단일 문자열 shorthand 허용)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleList(pub BTreeSet<Role>);

impl Serialize for RoleList {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.0.iter().map(|r| r.as_str()))
    }
}

impl<'de> Deserialize<'de> for RoleList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct RoleListVisitor;

        fn expand<E: de::Error>(
            name: &str,
            roles: &mut BTreeSet<Role>,
        ) -> std::result::Result<(), E> {
            let expanded =
                Role::expand(name).ok_or_else(|| E::custom(format!("unknown role '{}'", name)))?;
            roles.extend(expanded);
            Ok(())
        }

        impl<'de> Visitor<'de> for RoleListVisitor {
            type Value = RoleList;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a role name or a sequence of role names")
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                // Shorthand: 단일 문자열 → 한 원소 목록
                let mut roles = BTreeSet::new();
                expand(value, &mut roles)?;
                Ok(RoleList(roles))
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut roles = BTreeSet::new();
                while let Some(name) = seq.next_element::<String>()? {
                    expand(&name, &mut roles)?;
                }
                Ok(RoleList(roles))
            }
        }

        deserializer.deserialize_any(RoleListVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaCatalog;

    #[test]
    fn test_parse_policy_document() {
        let yaml = r#"
policies:
  - table: discussions
    name: discussions_select_all
    command: select
    roles: public
    using: "true"
  - table: discussions
    name: discussions_insert_own
    command: insert
    roles: [authenticated]
    with_check: "owner_id == auth.uid()"
  - table: discussions
    name: discussions_service
    command: all
    roles: [service_role]
    using: "true"
"#;

        let doc = PolicyDocument::from_yaml(yaml).unwrap();
        let policies = doc.compile().unwrap();
        assert_eq!(policies.len(), 3);

        assert_eq!(policies[0].command, Command::Read);
        assert_eq!(policies[0].roles.len(), 3);

        assert_eq!(policies[1].command, Command::Create);
        assert!(policies[1].using.is_trivially_true());
        assert_eq!(policies[1].check_predicate(), &Expr::owner_is_actor());

        assert!(policies[2].is_bypass());
        assert!(policies[2].command.covers(Command::Delete));
    }

    #[test]
    fn test_roles_default_to_all() {
        let yaml = r#"
policies:
  - table: replies
    name: replies_read
    command: read
"#;
        let policies = PolicyDocument::from_yaml(yaml).unwrap().compile().unwrap();
        assert!(Role::ALL.iter().all(|r| policies[0].applies_to(*r)));
        assert!(policies[0].permissive);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let yaml = r#"
policies:
  - table: replies
    name: replies_read
    command: read
    roles: [admin]
"#;
        assert!(PolicyDocument::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_with_check_on_read_rejected() {
        let def = PolicyDefinition {
            table: "replies".to_string(),
            name: "bad".to_string(),
            command: Command::Read,
            roles: RoleList::default(),
            permissive: true,
            using: None,
            with_check: Some("true".to_string()),
        };
        assert!(matches!(def.compile(), Err(Error::PolicyParse { .. })));
    }

    #[test]
    fn test_expression_errors_carry_policy_name() {
        let def = PolicyDefinition {
            table: "replies".to_string(),
            name: "broken".to_string(),
            command: Command::Update,
            roles: RoleList::default(),
            permissive: true,
            using: Some("owner_id ==".to_string()),
            with_check: None,
        };
        let err = def.compile().unwrap_err();
        assert!(err.to_string().contains("replies.broken using"));
    }

    #[test]
    fn test_bind_against_schema() {
        let catalog = SchemaCatalog::forum().unwrap();
        let accounts = catalog.get_table("accounts").unwrap();

        let policy = Policy::new("accounts", "own", Command::Any)
            .for_roles([Role::Authenticated])
            .using(Expr::owner_is_actor());
        let bound = policy.bind(accounts).unwrap();
        assert_eq!(bound.using.to_string(), "id == actor_id()");

        let broken = Policy::new("accounts", "broken", Command::Read)
            .using(parse_expr("nickname == 'x'").unwrap());
        assert!(matches!(broken.bind(accounts), Err(Error::SchemaMismatch { .. })));
    }

    #[test]
    fn test_command_coverage() {
        assert!(Command::Any.covers(Command::Create));
        assert!(Command::Read.covers(Command::Read));
        assert!(!Command::Read.covers(Command::Update));
        assert!(Command::Update.reads_existing() && Command::Update.writes_proposed());
        assert!(!Command::Create.reads_existing());
        assert_eq!(Command::from_str("SELECT"), Some(Command::Read));
    }
}
