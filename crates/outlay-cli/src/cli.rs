//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use outlay_core::models::{FORM_CATEGORIES, MAX_FORM_INSTALLMENTS};

fn category_help() -> String {
    format!(
        "Category label; the entry form offers {} (any free text is accepted)",
        FORM_CATEGORIES.join(", ")
    )
}

fn installments_help() -> String {
    format!(
        "Installment count, optionally suffixed with x (the entry form offers 1..={})",
        MAX_FORM_INSTALLMENTS
    )
}

/// Outlay - Track purchases and installment plans
#[derive(Parser)]
#[command(name = "outlay")]
#[command(about = "Self-hosted purchase and installment tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "outlay.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set OUTLAY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires Cloudflare Access authentication headers.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Receipt parser endpoint (defaults to OUTLAY_PARSER_URL)
        ///
        /// The import endpoint returns 503 until a parser is configured.
        #[arg(long)]
        parser_url: Option<String>,

        /// Cloudflare Access team name (defaults to CF_TEAM_NAME)
        #[arg(long)]
        cf_team_name: Option<String>,

        /// Cloudflare Access audience tag (defaults to CF_AUD_TAG)
        #[arg(long)]
        cf_aud_tag: Option<String>,
    },

    /// Show the spending summary and installment projections
    Dashboard {
        /// Identity whose purchases to aggregate
        #[arg(long, default_value = "local-dev")]
        user: String,

        /// Reference date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        reference: Option<String>,
    },

    /// List stored purchases
    List {
        /// Identity whose purchases to list
        #[arg(long, default_value = "local-dev")]
        user: String,
    },

    /// Record one purchase
    Add {
        /// Category label
        #[arg(long, default_value = "Other", long_help = category_help())]
        category: String,

        /// Purchase date, DD/MM/YYYY or YYYY-MM-DD
        #[arg(long)]
        date: String,

        /// Merchant name
        #[arg(short, long)]
        merchant: String,

        /// Purchase location
        #[arg(long, default_value = "")]
        location: String,

        /// Free-form notes
        #[arg(long, default_value = "")]
        notes: String,

        /// Installment count (e.g. 3x)
        #[arg(short, long, default_value = "1", long_help = installments_help())]
        installments: String,

        /// Amount in the base currency unit
        #[arg(short, long)]
        amount: f64,

        /// Identity to record the purchase under
        #[arg(long, default_value = "local-dev")]
        user: String,
    },

    /// Delete one purchase by id
    Delete {
        /// Purchase id (see 'outlay list')
        id: i64,

        /// Identity the purchase belongs to
        #[arg(long, default_value = "local-dev")]
        user: String,
    },

    /// Replace the stored snapshot from a JSON file
    Save {
        /// JSON file holding an array of purchase records
        #[arg(short, long)]
        file: PathBuf,

        /// Identity whose snapshot to replace
        #[arg(long, default_value = "local-dev")]
        user: String,
    },

    /// Parse receipt files through the parser service
    Import {
        /// Receipt files (PNG, JPEG, or PDF; repeatable)
        #[arg(short, long, required = true, num_args = 1..)]
        file: Vec<PathBuf>,

        /// Receipt parser endpoint (defaults to OUTLAY_PARSER_URL)
        #[arg(long)]
        parser_url: Option<String>,

        /// Store the parsed rows instead of just printing them
        #[arg(long)]
        save: bool,

        /// Identity to import under
        #[arg(long, default_value = "local-dev")]
        user: String,
    },

    /// Show database status (encryption, size, counts)
    Status,
}
