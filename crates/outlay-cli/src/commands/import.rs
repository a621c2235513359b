//! Receipt import command implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use outlay_core::db::Database;
use outlay_core::import::{validate_upload, HttpReceiptParser, ReceiptParser, UploadFile};

use super::truncate;

/// Content type by extension; empty when unknown (the upload checks then
/// fall back to the extension)
fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("pdf") => "application/pdf",
        _ => "",
    }
}

pub async fn cmd_import(
    db: &Database,
    user: &str,
    files: &[PathBuf],
    parser_url: Option<&str>,
    save: bool,
) -> Result<()> {
    let endpoint = parser_url
        .map(str::to_string)
        .or_else(|| std::env::var("OUTLAY_PARSER_URL").ok())
        .filter(|s| !s.is_empty())
        .context("No parser configured. Set OUTLAY_PARSER_URL or pass --parser-url")?;

    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("receipt")
            .to_string();
        let upload = UploadFile {
            filename,
            content_type: content_type_for(path).to_string(),
            bytes,
        };
        validate_upload(&upload)?;
        uploads.push(upload);
    }

    println!(
        "📥 Parsing {} receipt{} via {}...",
        uploads.len(),
        if uploads.len() == 1 { "" } else { "s" },
        endpoint
    );

    let parser = HttpReceiptParser::new(&endpoint);
    let parsed = parser.parse_files(user, &uploads).await?;

    if parsed.is_empty() {
        println!("   No purchases found in the uploaded receipts.");
        return Ok(());
    }

    println!("   Found {} purchase{}", parsed.len(), if parsed.len() == 1 { "" } else { "s" });
    println!();
    println!(
        "   {:12} │ {:>10} │ {:>4} │ {}",
        "Date", "Amount", "Inst", "Merchant"
    );
    println!("   ─────────────┼────────────┼──────┼─────────────────────");
    for p in &parsed {
        println!(
            "   {:12} │ {:>10.2} │ {:>4} │ {}",
            p.purchase_date.as_deref().unwrap_or("(today)"),
            p.amount.unwrap_or(0.0),
            p.installments.as_deref().unwrap_or("1"),
            truncate(p.merchant.as_deref().unwrap_or("(unknown)"), 30)
        );
    }

    if save {
        let today = chrono::Local::now().date_naive();
        let count = parsed.len();
        let records = db.insert_parsed(user, parsed, today)?;
        db.log_audit(
            user,
            "import",
            Some("purchase"),
            None,
            Some(&format!("count={}", count)),
        )?;
        println!();
        println!("✅ Stored {} purchase{}", records.len(), if records.len() == 1 { "" } else { "s" });
    } else {
        println!();
        println!("   Rows were not stored. Re-run with --save to append them.");
    }

    Ok(())
}
