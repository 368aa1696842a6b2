use sqlx::{SqlitePool, migrate::Migrator};

use super::model::Person;

/// Table holding imported persons.
pub const PERSON_TABLE: &str = "person";

/// Embedded schema migrations (`migrations/`).
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Number of stored persons.
pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM person")
        .fetch_one(pool)
        .await
}

/// Stored persons in insertion order.
pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Person>, sqlx::Error> {
    sqlx::query_as::<_, Person>(
        "SELECT id, user_id, first_name, last_name, gender, email, phone, date_of_birth, job_title \
         FROM person ORDER BY id",
    )
    .fetch_all(pool)
    .await
}

/// Stored persons with the given external user id.
pub async fn find_by_user_id(pool: &SqlitePool, user_id: &str) -> Result<Vec<Person>, sqlx::Error> {
    sqlx::query_as::<_, Person>(
        "SELECT id, user_id, first_name, last_name, gender, email, phone, date_of_birth, job_title \
         FROM person WHERE user_id = ? ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
