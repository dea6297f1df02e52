use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use tracing::{debug, info};

/// Parses a `sqlite://` URL; the database file is created on first connect.
pub fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(database_url)?.create_if_missing(true))
}

/// Opens one short-lived SQLite connection. Callers drop it when their operation ends.
pub async fn open_connection(
    options: &SqliteConnectOptions,
) -> Result<SqliteConnection, sqlx::Error> {
    debug!("opening SQLite connection");
    SqliteConnection::connect_with(options).await
}

/// Creates the offer table when missing.
pub async fn init_schema(options: &SqliteConnectOptions) -> Result<(), sqlx::Error> {
    let mut conn = open_connection(options).await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_offers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            responsibilities TEXT NOT NULL DEFAULT '[]',
            skills TEXT NOT NULL DEFAULT '[]',
            location TEXT,
            experience_years INTEGER,
            contact_email TEXT,
            filename TEXT,
            offer_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )
        "#,
    )
    .execute(&mut conn)
    .await?;
    conn.close().await?;

    info!("offer table ready");
    Ok(())
}
