//! 정책 목록 명령어

use crate::config::Config;
use crate::OutputFormat;

pub fn list(config: &Config, table: Option<&str>, format: OutputFormat) -> anyhow::Result<()> {
    let store = super::load_store(config)?;
    if let Some(name) = table {
        if !store.catalog().has_table(name) {
            anyhow::bail!("Unknown table '{}'", name);
        }
    }
    let policies = store.list(table)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&policies)?),
        OutputFormat::Text => {
            for policy in &policies {
                let roles: Vec<&str> = policy.roles.iter().map(|r| r.as_str()).collect();
                println!(
                    "{}.{} [{}] roles={} {}",
                    policy.table,
                    policy.name,
                    policy.command,
                    roles.join(","),
                    if policy.permissive { "permissive" } else { "restrictive" }
                );
                println!("  using: {}", policy.using);
                if let Some(check) = &policy.with_check {
                    println!("  with_check: {}", check);
                }
            }
            println!("{} policies", policies.len());
        }
    }
    Ok(())
}
