//! Outlay CLI - Purchase and installment tracker
//!
//! Usage:
//!   outlay init                 Initialize database
//!   outlay add --merchant ...   Record a purchase
//!   outlay dashboard            Show spending summary and projections
//!   outlay serve --port 3000    Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
            parser_url,
            cf_team_name,
            cf_aud_tag,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                static_dir.as_deref(),
                parser_url.as_deref(),
                cf_team_name.as_deref(),
                cf_aud_tag.as_deref(),
            )
            .await
        }
        Commands::Dashboard { user, reference } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_dashboard(&db, &user, reference.as_deref())
        }
        Commands::List { user } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_list(&db, &user)
        }
        Commands::Add {
            category,
            date,
            merchant,
            location,
            notes,
            installments,
            amount,
            user,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_add(
                &db,
                &user,
                &category,
                &date,
                &merchant,
                &location,
                &notes,
                &installments,
                amount,
            )
        }
        Commands::Delete { id, user } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_delete(&db, &user, id)
        }
        Commands::Save { file, user } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_save(&db, &user, &file)
        }
        Commands::Import {
            file,
            parser_url,
            save,
            user,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &user, &file, parser_url.as_deref(), save).await
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt),
    }
}
