//! CLI 명령어 구현

pub mod decide;
pub mod lint;
pub mod policies;

use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::Context;
use rowgate_core::permissions::{
    provision, AuditSink, DecisionEngine, EngineConfig, JsonLinesAuditSink, PolicyDocument,
    PolicyStore, TracingAuditSink, FORUM_POLICIES,
};
use rowgate_core::schema::{SchemaCatalog, SchemaParser};

use crate::config::Config;

/// 프로비저닝 행위자 이름
const PROVISIONER: &str = "rowgate-cli";

/// 스키마 로드 (파일 또는 내장 forum)
fn load_catalog(config: &Config) -> anyhow::Result<SchemaCatalog> {
    match &config.schema_path {
        Some(path) => {
            let yaml = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read schema file {}", path.display()))?;
            Ok(SchemaParser::parse_yaml(&yaml)?)
        }
        None => Ok(SchemaCatalog::forum()?),
    }
}

/// 정책 문서 로드 (파일 또는 내장 forum)
fn load_policies(config: &Config) -> anyhow::Result<PolicyDocument> {
    match &config.policies_path {
        Some(path) => {
            let yaml = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read policy file {}", path.display()))?;
            Ok(PolicyDocument::from_yaml(&yaml)?)
        }
        None => Ok(PolicyDocument::from_yaml(FORUM_POLICIES)?),
    }
}

fn audit_sink(config: &Config) -> anyhow::Result<Arc<dyn AuditSink>> {
    match &config.audit_log {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open audit log {}", path.display()))?;
            Ok(Arc::new(JsonLinesAuditSink::new(file)))
        }
        None => Ok(Arc::new(TracingAuditSink)),
    }
}

/// 스키마와 정책을 로드하여 프로비저닝된 저장소 생성
pub fn load_store(config: &Config) -> anyhow::Result<Arc<PolicyStore>> {
    let catalog = Arc::new(load_catalog(config)?);
    let store = Arc::new(PolicyStore::new(catalog, audit_sink(config)?));
    let document = load_policies(config)?;
    provision(&store, &document, PROVISIONER)?;
    Ok(store)
}

/// 판정 엔진 생성
pub fn load_engine(config: &Config) -> anyhow::Result<DecisionEngine> {
    let engine = DecisionEngine::new(load_store(config)?).with_config(EngineConfig {
        redaction_marker: config.redaction_marker.clone(),
        audit_reads: config.audit_reads,
    });
    Ok(engine)
}
