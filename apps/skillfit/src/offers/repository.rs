//! Offer repository: CRUD over the `job_offers` SQLite table.
//!
//! Every operation opens its own connection and closes it when done. There is
//! no pool and no transaction spanning two operations.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::types::Json;
use sqlx::Connection;
use tracing::info;

use crate::db::{connect_options, init_schema, open_connection};
use crate::models::offer::{offer_reference, NewOffer, Offer, OfferRow};

#[derive(Debug, Clone)]
pub struct OfferRepository {
    options: SqliteConnectOptions,
}

impl OfferRepository {
    /// Parses `database_url` and makes sure the table exists.
    pub async fn open(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = connect_options(database_url)?;
        init_schema(&options).await?;
        Ok(Self { options })
    }

    async fn connect(&self) -> Result<SqliteConnection, sqlx::Error> {
        open_connection(&self.options).await
    }

    /// Stores a new offer; the id and `created_at` are assigned here.
    pub async fn insert(&self, offer: &NewOffer) -> Result<Offer, sqlx::Error> {
        let mut conn = self.connect().await?;
        let created_at = Utc::now().to_rfc3339();

        let id = sqlx::query(
            r#"
            INSERT INTO job_offers
                (title, description, responsibilities, skills, location,
                 experience_years, contact_email, filename, offer_date, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(Json(&offer.responsibilities))
        .bind(Json(&offer.skills))
        .bind(&offer.location)
        .bind(offer.experience_years)
        .bind(&offer.contact_email)
        .bind(&offer.filename)
        .bind(&offer.offer_date)
        .bind(&created_at)
        .execute(&mut conn)
        .await?
        .last_insert_rowid();

        let stored = fetch_row(&mut conn, id).await?.ok_or(sqlx::Error::RowNotFound)?;
        conn.close().await?;

        info!(reference = %offer_reference(id), title = %offer.title, "offer stored");
        Ok(stored.into())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Offer>, sqlx::Error> {
        let mut conn = self.connect().await?;
        let row = fetch_row(&mut conn, id).await?;
        conn.close().await?;
        Ok(row.map(Offer::from))
    }

    /// Every offer, newest first.
    pub async fn list(&self) -> Result<Vec<Offer>, sqlx::Error> {
        let mut conn = self.connect().await?;
        let rows: Vec<OfferRow> = sqlx::query_as("SELECT * FROM job_offers ORDER BY id DESC")
            .fetch_all(&mut conn)
            .await?;
        conn.close().await?;
        Ok(rows.into_iter().map(Offer::from).collect())
    }

    /// Replaces the offer's fields and stamps `updated_at`. `None` when the id is unknown.
    pub async fn update(&self, id: i64, offer: &NewOffer) -> Result<Option<Offer>, sqlx::Error> {
        let mut conn = self.connect().await?;
        let updated_at = Utc::now().to_rfc3339();

        let affected = sqlx::query(
            r#"
            UPDATE job_offers SET
                title = ?, description = ?, responsibilities = ?, skills = ?,
                location = ?, experience_years = ?, contact_email = ?,
                filename = ?, offer_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(Json(&offer.responsibilities))
        .bind(Json(&offer.skills))
        .bind(&offer.location)
        .bind(offer.experience_years)
        .bind(&offer.contact_email)
        .bind(&offer.filename)
        .bind(&offer.offer_date)
        .bind(&updated_at)
        .bind(id)
        .execute(&mut conn)
        .await?
        .rows_affected();

        let row = if affected == 0 {
            None
        } else {
            fetch_row(&mut conn, id).await?
        };
        conn.close().await?;

        if row.is_some() {
            info!(reference = %offer_reference(id), "offer updated");
        }
        Ok(row.map(Offer::from))
    }

    /// `false` when no offer had this id.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut conn = self.connect().await?;
        let affected = sqlx::query("DELETE FROM job_offers WHERE id = ?")
            .bind(id)
            .execute(&mut conn)
            .await?
            .rows_affected();
        conn.close().await?;

        if affected > 0 {
            info!(reference = %offer_reference(id), "offer deleted");
        }
        Ok(affected > 0)
    }
}

async fn fetch_row(conn: &mut SqliteConnection, id: i64) -> Result<Option<OfferRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM job_offers WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repository(dir: &tempfile::TempDir) -> OfferRepository {
        let url = format!("sqlite://{}", dir.path().join("offers.db").display());
        OfferRepository::open(&url).await.unwrap()
    }

    fn offer(title: &str) -> NewOffer {
        NewOffer {
            title: title.to_string(),
            description: Some("Analyse de données d'enquête".to_string()),
            responsibilities: vec!["Modéliser".to_string(), "Restituer".to_string()],
            skills: vec!["R".to_string(), "SAS".to_string()],
            location: Some("Lyon".to_string()),
            experience_years: Some(3),
            contact_email: Some("rh@example.fr".to_string()),
            filename: Some("annonce.pdf".to_string()),
            offer_date: Some("2025-11-20".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;

        let stored = repo.insert(&offer("Statisticien")).await.unwrap();
        assert_eq!(stored.id, 1);
        assert_eq!(stored.reference, "OFFRE-001");
        assert!(stored.updated_at.is_none());

        let fetched = repo.get(stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.skills, vec!["R", "SAS"]);
        assert_eq!(fetched.description.as_deref(), Some("Analyse de données d'enquête"));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;
        repo.insert(&offer("A")).await.unwrap();
        repo.insert(&offer("B")).await.unwrap();
        repo.insert(&offer("C")).await.unwrap();

        let titles: Vec<_> = repo.list().await.unwrap().into_iter().map(|o| o.title).collect();
        assert_eq!(titles, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn test_update_stamps_updated_at_and_keeps_id() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;
        let stored = repo.insert(&offer("Statisticien")).await.unwrap();

        let mut changed = offer("Statisticien senior");
        changed.skills.push("Python".to_string());
        changed.experience_years = None;
        let updated = repo.update(stored.id, &changed).await.unwrap().unwrap();

        assert_eq!(updated.id, stored.id);
        assert_eq!(updated.created_at, stored.created_at);
        assert!(updated.updated_at.is_some());
        assert_eq!(updated.title, "Statisticien senior");
        assert_eq!(updated.skills.len(), 3);
        assert_eq!(updated.experience_years, None);

        assert!(repo.update(99, &changed).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;
        let stored = repo.insert(&offer("Statisticien")).await.unwrap();

        assert!(repo.delete(stored.id).await.unwrap());
        assert!(!repo.delete(stored.id).await.unwrap());
        assert!(repo.get(stored.id).await.unwrap().is_none());
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows_and_ids_are_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir).await;
        let first = repo.insert(&offer("A")).await.unwrap();
        repo.delete(first.id).await.unwrap();
        repo.insert(&offer("B")).await.unwrap();

        let reopened = repository(&dir).await;
        let all = reopened.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, 2);
    }
}
