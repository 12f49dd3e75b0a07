//! 행위자 역할 판별
//!
//! 인증 서브시스템(외부)의 결과를 고정된 역할 집합 중 하나로 분류합니다.
//! predicate 로직은 없으며, 인증 계층과 맞닿는 유일한 지점입니다.

use serde::{Deserialize, Serialize};

/// 행위자 역할
///
/// 요청마다 정확히 하나가 결정되며 조합되지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// 검증된 신원 없음
    Anonymous,

    /// 일반 자격 증명으로 검증된 사용자
    Authenticated,

    /// 시스템/서비스 자격 증명 (우회 정책 대상)
    Privileged,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Anonymous, Role::Authenticated, Role::Privileged];

    /// 정책 정의의 역할 이름 파싱
    ///
    /// `public`은 여러 역할로 확장되므로 `expand`를 사용합니다.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "anonymous" | "anon" => Some(Role::Anonymous),
            "authenticated" => Some(Role::Authenticated),
            "privileged" | "service_role" | "system" => Some(Role::Privileged),
            _ => None,
        }
    }

    /// 역할 이름 또는 `public`을 역할 목록으로 확장
    pub fn expand(s: &str) -> Option<Vec<Self>> {
        if s.eq_ignore_ascii_case("public") {
            return Some(Role::ALL.to_vec());
        }
        Role::from_str(s).map(|role| vec![role])
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::Authenticated => "authenticated",
            Role::Privileged => "privileged",
        }
    }

    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Privileged)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 외부 인증 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    /// 신원 검증 여부
    #[serde(default)]
    pub verified: bool,

    /// 시스템 자격 증명 여부
    #[serde(default)]
    pub is_system: bool,

    /// 행위자 ID
    #[serde(default)]
    pub actor_id: Option<String>,
}

impl AuthResult {
    /// 익명 결과
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// 일반 사용자 결과
    pub fn user(actor_id: impl Into<String>) -> Self {
        Self {
            verified: true,
            is_system: false,
            actor_id: Some(actor_id.into()),
        }
    }

    /// 시스템 자격 증명 결과
    pub fn system(actor_id: impl Into<String>) -> Self {
        Self {
            verified: true,
            is_system: true,
            actor_id: Some(actor_id.into()),
        }
    }
}

/// 역할 판별기
pub struct RoleResolver;

impl RoleResolver {
    /// 인증 결과 → 역할
    ///
    /// 검증되지 않은 결과는 `is_system`과 무관하게 익명입니다.
    pub fn resolve(auth: &AuthResult) -> Role {
        match (auth.verified, auth.is_system) {
            (false, _) => Role::Anonymous,
            (true, false) => Role::Authenticated,
            (true, true) => Role::Privileged,
        }
    }

    /// 인증 결과 → (역할, 행위자 ID)
    ///
    /// 익명 행위자의 ID는 버립니다.
    pub fn resolve_actor(auth: &AuthResult) -> (Role, Option<String>) {
        let role = Self::resolve(auth);
        let actor_id = match role {
            Role::Anonymous => None,
            _ => auth.actor_id.clone(),
        };
        (role, actor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_roles() {
        assert_eq!(RoleResolver::resolve(&AuthResult::anonymous()), Role::Anonymous);
        assert_eq!(RoleResolver::resolve(&AuthResult::user("u1")), Role::Authenticated);
        assert_eq!(RoleResolver::resolve(&AuthResult::system("svc")), Role::Privileged);
    }

    #[test]
    fn test_unverified_system_never_elevates() {
        let auth = AuthResult {
            verified: false,
            is_system: true,
            actor_id: Some("svc".to_string()),
        };
        assert_eq!(RoleResolver::resolve_actor(&auth), (Role::Anonymous, None));
    }

    #[test]
    fn test_role_names() {
        assert_eq!(Role::from_str("anon"), Some(Role::Anonymous));
        assert_eq!(Role::from_str("service_role"), Some(Role::Privileged));
        assert_eq!(Role::from_str("admin"), None);
        assert_eq!(Role::expand("public").unwrap().len(), 3);
        assert_eq!(Role::expand("Authenticated"), Some(vec![Role::Authenticated]));
    }
}
