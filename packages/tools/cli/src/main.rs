//! Rowgate CLI (`rowgate`)
//!
//! 정책 세트를 오프라인으로 검사하고 접근 요청을 판정하는 Operator 도구입니다.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod config;

use commands::decide::DecideArgs;
use config::Config;

#[derive(Parser)]
#[command(name = "rowgate")]
#[command(
    author,
    version,
    about = "Rowgate CLI - row-level policy linting and access decisions",
    long_about = None
)]
struct Cli {
    /// Schema YAML file (default: built-in forum schema, or ROWGATE_SCHEMA)
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Policy YAML file (default: built-in forum policies, or ROWGATE_POLICIES)
    #[arg(long, global = true)]
    policies: Option<PathBuf>,

    /// Append audit records as JSON Lines to this file (or ROWGATE_AUDIT_LOG)
    #[arg(long, global = true)]
    audit_log: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    // ─────────────────────────────────────────────────────────────────────────
    // Provisioning
    // ─────────────────────────────────────────────────────────────────────────
    /// Check the policy set for unreachable commands and missing bypass policies
    Lint,

    /// List provisioned policies
    Policies {
        /// Only this table
        #[arg(long)]
        table: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Decisions
    // ─────────────────────────────────────────────────────────────────────────
    /// Evaluate one access request
    Decide {
        #[arg(long)]
        table: String,

        /// create | read | update | delete (insert/select aliases accepted)
        #[arg(long)]
        command: String,

        /// Actor id
        #[arg(long)]
        actor: Option<String>,

        /// Role (anonymous | authenticated | privileged); overrides --verified/--system
        #[arg(long, conflicts_with_all = ["verified", "system"])]
        role: Option<String>,

        /// Actor identity is verified
        #[arg(long)]
        verified: bool,

        /// Actor holds a system credential
        #[arg(long)]
        system: bool,

        /// Existing row as a JSON object
        #[arg(long)]
        existing: Option<String>,

        /// Proposed row as a JSON object
        #[arg(long)]
        proposed: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // 로깅 초기화 (stdout은 명령 출력용)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("ROWGATE_LOG")
                .unwrap_or_else(|_| "rowgate=info,rowgate_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // 설정 로드 (CLI 옵션 > 환경변수)
    let config = Config::from_env()?.with_overrides(cli.schema, cli.policies, cli.audit_log);
    tracing::debug!(?config, "Loaded configuration");

    // 명령 실행
    match cli.command {
        Commands::Lint => commands::lint::run(&config, cli.format),
        Commands::Policies { table } => {
            commands::policies::list(&config, table.as_deref(), cli.format)
        }
        Commands::Decide {
            table,
            command,
            actor,
            role,
            verified,
            system,
            existing,
            proposed,
        } => commands::decide::run(
            &config,
            DecideArgs {
                table,
                command,
                actor,
                role,
                verified,
                system,
                existing,
                proposed,
            },
            cli.format,
        ),
    }
}
