//! CLI command tests

use std::io::Write;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands;

fn temp_db_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("fisc.db")
}

#[test]
fn test_parse_serve_args() {
    let cli = Cli::try_parse_from(["fisc", "serve", "--port", "8080", "--dev-secret"]).unwrap();
    match cli.command {
        Commands::Serve {
            port,
            host,
            dev_secret,
        } => {
            assert_eq!(port, Some(8080));
            assert_eq!(host, "127.0.0.1");
            assert!(dev_secret);
        }
        _ => panic!("expected serve command"),
    }
}

#[test]
fn test_parse_import_requires_email() {
    assert!(Cli::try_parse_from(["fisc", "import", "--file", "x.csv"]).is_err());
}

#[test]
fn test_cmd_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db_path(&dir);

    commands::cmd_init(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn test_cmd_import_rejects_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db_path(&dir);
    commands::cmd_init(&path).unwrap();

    let file = dir.path().join("notes.txt");
    std::fs::write(&file, "hello").unwrap();

    let err = commands::cmd_import(&path, &file, "alice@example.com").unwrap_err();
    assert!(err.to_string().contains("Unsupported file type"));
}

#[test]
fn test_cmd_import_requires_existing_user() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db_path(&dir);
    commands::cmd_init(&path).unwrap();

    let file = dir.path().join("data.csv");
    let mut f = std::fs::File::create(&file).unwrap();
    writeln!(f, "budgetName,departmentName,projectName,vendorName,amount").unwrap();
    writeln!(f, "City 2026,Parks,Playgrounds,Acme Turf,100").unwrap();

    let err = commands::cmd_import(&path, &file, "nobody@example.com").unwrap_err();
    assert!(err.to_string().contains("No user"));
}

#[test]
fn test_cmd_import_csv_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = temp_db_path(&dir);

    let db = fisc_core::db::Database::new(path.to_str().unwrap()).unwrap();
    let user_id = db.create_user("alice@example.com", "hash").unwrap();

    let file = dir.path().join("data.csv");
    let mut f = std::fs::File::create(&file).unwrap();
    writeln!(f, "budgetName,departmentName,projectName,vendorName,amount,description").unwrap();
    writeln!(f, "City 2026,Parks,Playgrounds,Acme Turf,100.50,mulch").unwrap();
    writeln!(f, "City 2026,Roads,Paving,Asphalt Inc,200,").unwrap();
    drop(f);

    commands::cmd_import(&path, &file, "alice@example.com").unwrap();

    assert_eq!(db.list_budgets(user_id).unwrap().len(), 1);
    assert_eq!(db.list_transactions(user_id, None).unwrap().len(), 2);
}
