//! Server command implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use outlay_core::import::{HttpReceiptParser, ReceiptParser};

use super::open_db;

#[allow(clippy::too_many_arguments)]
pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    static_dir: Option<&Path>,
    parser_url: Option<&str>,
    cf_team_name: Option<&str>,
    cf_aud_tag: Option<&str>,
) -> Result<()> {
    println!("🚀 Starting Outlay web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    // Flags win; environment fills the gaps
    let team_name = cf_team_name
        .map(str::to_string)
        .or_else(|| std::env::var("CF_TEAM_NAME").ok())
        .filter(|s| !s.is_empty());
    let audience = cf_aud_tag
        .map(str::to_string)
        .or_else(|| std::env::var("CF_AUD_TAG").ok())
        .filter(|s| !s.is_empty());
    let cf_jwt_enabled = team_name.is_some() && audience.is_some();

    let parser_url = parser_url
        .map(str::to_string)
        .or_else(|| std::env::var("OUTLAY_PARSER_URL").ok())
        .filter(|s| !s.is_empty());

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else if cf_jwt_enabled {
        println!("   🔐 Authentication: Cloudflare Access (JWT validated)");
    } else {
        println!("   🔒 Authentication: Cloudflare Access (header only)");
        println!("      Set CF_TEAM_NAME and CF_AUD_TAG for cryptographic JWT validation");
    }

    match parser_url {
        Some(ref url) => println!("   🧾 Receipt parser: {}", url),
        None => {
            println!("   🧾 Receipt parser: not configured");
            println!("      Set OUTLAY_PARSER_URL or pass --parser-url to enable import");
        }
    }

    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = outlay_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        cf_access: outlay_server::CfAccessConfig {
            team_name,
            audience,
        },
    };

    let parser: Option<Arc<dyn ReceiptParser>> = parser_url
        .as_deref()
        .map(|url| Arc::new(HttpReceiptParser::new(url)) as Arc<dyn ReceiptParser>);

    let static_dir_str =
        static_dir.map(|p| p.to_str().expect("static_dir path must be valid UTF-8"));
    outlay_server::serve_with_config(db, parser, host, port, static_dir_str, config).await?;

    Ok(())
}
