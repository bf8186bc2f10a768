//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

use super::open_db;

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;

    // Ensure default categories are seeded (idempotent)
    db.seed_default_categories()
        .context("Failed to seed default categories")?;

    println!("🚀 Starting Divvy web server...");
    println!("   Database: {}", db.path());
    println!("   Listening: http://{}:{}", host, port);

    // Parse allowed CORS origins from environment (comma-separated)
    let allowed_origins: Vec<String> = std::env::var("DIVVY_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if !allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} (DIVVY_ALLOWED_ORIGINS)",
            allowed_origins.join(", ")
        );
    }
    if !db.is_encrypted() {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let config = divvy_server::ServerConfig { allowed_origins };

    divvy_server::serve_with_config(db, host, port, config).await?;

    Ok(())
}
