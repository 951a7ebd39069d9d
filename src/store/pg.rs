//! Postgres-backed store.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::models::{CredentialKind, OneTimeCredential, OwnershipAnchor};

use super::{AuthStore, StoreError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run pending migrations. Called once at startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(sqlx::Error::Migrate(Box::new(e))))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    fn row_to_credential(row: &sqlx::postgres::PgRow) -> Result<OneTimeCredential, sqlx::Error> {
        let kind_code: String = row.try_get("kind")?;
        let kind = CredentialKind::parse(&kind_code).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "kind".to_string(),
            source: format!("unknown credential kind {kind_code:?}").into(),
        })?;
        Ok(OneTimeCredential {
            email: row.try_get("email")?,
            kind,
            secret_hash: row.try_get("secret_hash")?,
            expires_at: row.try_get("expires_at")?,
            attempts: row.try_get("attempts")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn replace_credential(&self, credential: OneTimeCredential) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO one_time_credentials (email, kind, secret_hash, expires_at, attempts, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email, kind) DO UPDATE
            SET secret_hash = EXCLUDED.secret_hash,
                expires_at = EXCLUDED.expires_at,
                attempts = EXCLUDED.attempts,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&credential.email)
        .bind(credential.kind.as_str())
        .bind(&credential.secret_hash)
        .bind(credential.expires_at)
        .bind(credential.attempts)
        .bind(credential.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_credential(
        &self,
        email: &str,
        kind: CredentialKind,
    ) -> Result<Option<OneTimeCredential>, StoreError> {
        let row = sqlx::query(
            "SELECT email, kind, secret_hash, expires_at, attempts, created_at
             FROM one_time_credentials WHERE email = $1 AND kind = $2",
        )
        .bind(email)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::row_to_credential(&r))
            .transpose()
            .map_err(StoreError::Database)
    }

    async fn find_credential_by_hash(
        &self,
        kind: CredentialKind,
        secret_hash: &str,
    ) -> Result<Option<OneTimeCredential>, StoreError> {
        let row = sqlx::query(
            "SELECT email, kind, secret_hash, expires_at, attempts, created_at
             FROM one_time_credentials WHERE kind = $1 AND secret_hash = $2",
        )
        .bind(kind.as_str())
        .bind(secret_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::row_to_credential(&r))
            .transpose()
            .map_err(StoreError::Database)
    }

    async fn record_attempt(&self, email: &str, kind: CredentialKind) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE one_time_credentials SET attempts = attempts + 1
             WHERE email = $1 AND kind = $2",
        )
        .bind(email)
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_credential(
        &self,
        email: &str,
        kind: CredentialKind,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM one_time_credentials WHERE email = $1 AND kind = $2")
            .bind(email)
            .bind(kind.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_ownership(
        &self,
        profile_id: i64,
    ) -> Result<Option<OwnershipAnchor>, StoreError> {
        let row = sqlx::query("SELECT id, owner_email FROM providers WHERE id = $1")
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(r) => Some(OwnershipAnchor {
                profile_id: r.try_get("id")?,
                owner_email: r.try_get("owner_email")?,
            }),
            None => None,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
