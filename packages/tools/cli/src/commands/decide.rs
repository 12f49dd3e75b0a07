//! 접근 판정 명령어

use rowgate_core::permissions::{
    AccessRequest, AuthResult, Command, Role, RoleResolver, Row,
};

use crate::config::Config;
use crate::OutputFormat;

/// 판정 요청 인자
pub struct DecideArgs {
    pub table: String,
    pub command: String,
    pub actor: Option<String>,
    pub role: Option<String>,
    pub verified: bool,
    pub system: bool,
    pub existing: Option<String>,
    pub proposed: Option<String>,
}

fn parse_row(label: &str, json: Option<&str>) -> anyhow::Result<Option<Row>> {
    json.map(|text| {
        serde_json::from_str::<Row>(text)
            .map_err(|e| anyhow::anyhow!("--{} must be a JSON object: {}", label, e))
    })
    .transpose()
}

/// 역할 결정 (`--role`이 우선, 없으면 인증 결과로 판별)
fn resolve_role(args: &DecideArgs) -> anyhow::Result<(Role, Option<String>)> {
    match &args.role {
        Some(name) => {
            let role = Role::from_str(name)
                .ok_or_else(|| anyhow::anyhow!("Unknown role '{}'", name))?;
            Ok((role, args.actor.clone()))
        }
        None => Ok(RoleResolver::resolve_actor(&AuthResult {
            verified: args.verified,
            is_system: args.system,
            actor_id: args.actor.clone(),
        })),
    }
}

pub fn run(config: &Config, args: DecideArgs, format: OutputFormat) -> anyhow::Result<()> {
    let command = Command::from_str(&args.command)
        .ok_or_else(|| anyhow::anyhow!("Unknown command '{}'", args.command))?;
    let (role, actor_id) = resolve_role(&args)?;

    let request = AccessRequest {
        actor_id,
        role,
        table: args.table.clone(),
        command,
        existing_row: parse_row("existing", args.existing.as_deref())?,
        proposed_row: parse_row("proposed", args.proposed.as_deref())?,
    };

    let engine = super::load_engine(config)?;
    let verdict = engine.decide(&request)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&verdict)?),
        OutputFormat::Text => {
            println!(
                "{} ({})",
                if verdict.allowed { "ALLOW" } else { "DENY" },
                verdict.reason
            );
            for name in &verdict.matched_policies {
                println!("  matched: {}", name);
            }
        }
    }
    Ok(())
}
