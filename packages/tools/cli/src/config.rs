//! CLI 설정

use std::env;
use std::path::PathBuf;

/// CLI 설정
///
/// 환경변수(`.env` 포함)에서 읽고, 명령줄 옵션이 있으면 덮어씁니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// 스키마 YAML 경로 (없으면 내장 forum 스키마)
    pub schema_path: Option<PathBuf>,

    /// 정책 YAML 경로 (없으면 내장 forum 정책)
    pub policies_path: Option<PathBuf>,

    /// 감사 로그 JSON Lines 파일 (없으면 tracing으로 출력)
    pub audit_log: Option<PathBuf>,

    /// 감사 로그 민감 필드 대체 문자열
    pub redaction_marker: String,

    /// read 판정 감사 기록 여부
    pub audit_reads: bool,
}

impl Config {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            schema_path: env::var("ROWGATE_SCHEMA").ok().map(PathBuf::from),

            policies_path: env::var("ROWGATE_POLICIES").ok().map(PathBuf::from),

            audit_log: env::var("ROWGATE_AUDIT_LOG").ok().map(PathBuf::from),

            redaction_marker: env::var("ROWGATE_REDACTION_MARKER")
                .unwrap_or_else(|_| "[redacted]".to_string()),

            audit_reads: env::var("ROWGATE_AUDIT_READS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("ROWGATE_AUDIT_READS must be 'true' or 'false'"))?,
        })
    }

    /// 명령줄 옵션 적용
    pub fn with_overrides(
        mut self,
        schema: Option<PathBuf>,
        policies: Option<PathBuf>,
        audit_log: Option<PathBuf>,
    ) -> Self {
        if schema.is_some() {
            self.schema_path = schema;
        }
        if policies.is_some() {
            self.policies_path = policies;
        }
        if audit_log.is_some() {
            self.audit_log = audit_log;
        }
        self
    }
}
