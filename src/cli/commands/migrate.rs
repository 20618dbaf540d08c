use anyhow::Context;
use clap::Args;
use serde_json::json;

use crate::app::AppState;
use crate::cli::{output, OutputFormat};
use crate::database::{schema, DatabaseManager};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    #[arg(long, help = "Print the DDL instead of applying it")]
    pub dry_run: bool,
}

pub async fn handle(args: MigrateArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    if args.dry_run {
        for statement in schema::BOOTSTRAP_STATEMENTS {
            println!("{};\n", statement.trim());
        }
        return Ok(());
    }

    let pool = DatabaseManager::main_pool()
        .await
        .context("connecting to DATABASE_URL")?;
    schema::bootstrap(&pool).await.context("applying schema")?;
    let seeded = AppState::postgres(pool)
        .profiles
        .seed_system_profiles()
        .await
        .context("seeding system profiles")?;
    DatabaseManager::close_all().await;

    output::output_success(
        output_format,
        "Schema is up to date",
        Some(json!({
            "statements": schema::BOOTSTRAP_STATEMENTS.len(),
            "profiles_seeded": seeded,
        })),
    )
}
