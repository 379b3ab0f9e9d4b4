//! Command implementations

use std::path::Path;

use anyhow::{bail, Context, Result};

use fisc_core::db::{Database, IMPORT_TIME_BUDGET};
use fisc_core::import::{parse_file, ACCEPTED_EXTENSIONS};
use fisc_server::ServerConfig;

fn open_db(db_path: &Path) -> Result<Database> {
    let path = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path).with_context(|| format!("Failed to open database at {}", path))
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    println!("✅ Database initialized at {}", db.path());
    Ok(())
}

pub async fn cmd_serve(db_path: &Path, host: &str, port: Option<u16>, dev_secret: bool) -> Result<()> {
    let db = open_db(db_path)?;

    let port = match port {
        Some(port) => port,
        None => std::env::var("FISC_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000),
    };

    let config = if dev_secret {
        println!("⚠️  Using the fixed development secret - do not expose to a network!");
        ServerConfig::with_dev_secret()
    } else {
        ServerConfig::from_env().context("Set FISC_JWT_SECRET or pass --dev-secret")?
    };

    println!("🚀 Starting fisc web server...");
    println!("   Database: {}", db.path());
    println!("   Listening: http://{}:{}", host, port);

    fisc_server::serve(db, host, port, config).await
}

pub fn cmd_import(db_path: &Path, file: &Path, email: &str) -> Result<()> {
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
        bail!("Unsupported file type; accepted: .csv, .xls, .xlsx");
    }

    let db = open_db(db_path)?;
    let user = db
        .get_user_by_email(email)?
        .with_context(|| format!("No user with email {} (sign up via the API first)", email))?;

    let rows = parse_file(file, &extension)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    let imported = db.import_rows(&rows, user.id, IMPORT_TIME_BUDGET)?;

    println!("✅ Imported {} transaction(s) for {}", imported, email);
    Ok(())
}
