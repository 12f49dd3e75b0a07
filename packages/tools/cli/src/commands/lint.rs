//! 정책 누락 검사 명령어

use rowgate_core::permissions::GapKind;

use crate::config::Config;
use crate::OutputFormat;

pub fn run(config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    let store = super::load_store(config)?;
    let gaps = store.lint()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&gaps)?),
        OutputFormat::Text => {
            if gaps.is_empty() {
                println!("No provisioning gaps");
            }
            for gap in &gaps {
                let label = match gap.kind {
                    GapKind::PrivilegedBypassMissing => "WARN  no privileged bypass",
                    GapKind::UnreachableForNonPrivileged => {
                        "INFO  unreachable for non-privileged roles"
                    }
                };
                println!("{}: {}.{}", label, gap.table, gap.command);
            }
        }
    }

    let lockouts = gaps
        .iter()
        .filter(|g| g.kind == GapKind::PrivilegedBypassMissing)
        .count();
    if lockouts > 0 {
        anyhow::bail!("{} table/command pairs have no privileged bypass policy", lockouts);
    }
    Ok(())
}
