#![allow(dead_code, unused_imports)]

mod mocks;

pub use mocks::MockPersonWriter;

use std::{fs, path::PathBuf};

use person_batch::{config::BatchConfig, person::repository::MIGRATOR};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tempfile::TempDir;

pub const HEADER: &str = "userId,firstName,lastName,gender,email,phone,dateOfBirth,jobTitle";

pub fn person_line(user_id: usize) -> String {
    format!(
        "{user_id},First{user_id},Last{user_id},Female,p{user_id}@example.com,555-{user_id},1990-01-01,Engineer"
    )
}

/// Header followed by `rows` well-formed lines, user ids starting at 1.
pub fn people_csv(rows: usize) -> String {
    let mut csv = String::from(HEADER);
    for user_id in 1..=rows {
        csv.push('\n');
        csv.push_str(&person_line(user_id));
    }
    csv.push('\n');
    csv
}

pub fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn batch_config(input_path: PathBuf, chunk_size: usize) -> BatchConfig {
    BatchConfig {
        input_path,
        chunk_size,
        ..BatchConfig::default()
    }
}

/// File-backed pool without schema.
pub async fn sqlite_pool(dir: &TempDir) -> SqlitePool {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("persons.db").display());
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .unwrap()
}

pub async fn migrated_pool(dir: &TempDir) -> SqlitePool {
    let pool = sqlite_pool(dir).await;
    MIGRATOR.run(&pool).await.unwrap();
    pool
}
