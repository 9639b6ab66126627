// SQLite-backed policy store for persistent settings.
//
// Tables:
// - settings: a single row holding the denylist (JSON array) and the toggles

use crate::core::policy::{CountryCode, PolicyError, PolicySnapshot, PolicyStore, PolicyToggle};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};
use std::collections::BTreeSet;

pub struct SqlitePolicyStore {
    pool: Pool<Sqlite>,
}

impl SqlitePolicyStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Create the settings table and seed the default row.
    pub async fn migrate(&self) -> Result<(), PolicyError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                countries TEXT NOT NULL DEFAULT '[]',
                delete_chat INTEGER NOT NULL DEFAULT 0,
                block_user INTEGER NOT NULL DEFAULT 0,
                log_user_info INTEGER NOT NULL DEFAULT 0,
                log_block INTEGER NOT NULL DEFAULT 1,
                log_delete INTEGER NOT NULL DEFAULT 1,
                log_errors INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PolicyError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO settings (countries)
            SELECT '[]' WHERE NOT EXISTS (SELECT 1 FROM settings)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PolicyError::StorageError(e.to_string()))?;

        Ok(())
    }

    fn column(toggle: PolicyToggle) -> &'static str {
        match toggle {
            PolicyToggle::DeleteChat => "delete_chat",
            PolicyToggle::BlockUser => "block_user",
            PolicyToggle::LogUserInfo => "log_user_info",
            PolicyToggle::LogOnBlock => "log_block",
            PolicyToggle::LogOnDelete => "log_delete",
            PolicyToggle::LogErrors => "log_errors",
        }
    }

    fn decode_countries(raw: &str) -> Result<BTreeSet<CountryCode>, PolicyError> {
        let codes: Vec<String> = serde_json::from_str(raw)
            .map_err(|e| PolicyError::StorageError(format!("Corrupt denylist: {}", e)))?;

        // Skip entries an older build may have written in a different shape
        Ok(codes
            .iter()
            .filter_map(|c| match CountryCode::parse(c) {
                Ok(code) => Some(code),
                Err(_) => {
                    tracing::warn!(entry = %c, "Ignoring invalid stored country code");
                    None
                }
            })
            .collect())
    }

    async fn write_denylist(&self, denylist: &BTreeSet<CountryCode>) -> Result<(), PolicyError> {
        let encoded = serde_json::to_string(denylist)
            .map_err(|e| PolicyError::StorageError(e.to_string()))?;

        sqlx::query("UPDATE settings SET countries = ?")
            .bind(encoded)
            .execute(&self.pool)
            .await
            .map_err(|e| PolicyError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for SqlitePolicyStore {
    async fn snapshot(&self) -> Result<PolicySnapshot, PolicyError> {
        let row = sqlx::query("SELECT * FROM settings LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PolicyError::StorageError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(PolicySnapshot::default());
        };

        let countries: String = row.get("countries");
        let mut snapshot = PolicySnapshot {
            denylist: Self::decode_countries(&countries)?,
            ..Default::default()
        };
        for toggle in PolicyToggle::ALL {
            snapshot.set_toggle(toggle, row.get::<i64, _>(Self::column(toggle)) != 0);
        }
        Ok(snapshot)
    }

    async fn get_denylist(&self) -> Result<BTreeSet<CountryCode>, PolicyError> {
        let row = sqlx::query("SELECT countries FROM settings LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PolicyError::StorageError(e.to_string()))?;

        match row {
            Some(row) => Self::decode_countries(&row.get::<String, _>("countries")),
            None => Ok(BTreeSet::new()),
        }
    }

    async fn add_to_denylist(&self, codes: &[CountryCode]) -> Result<(), PolicyError> {
        let mut denylist = self.get_denylist().await?;
        let before = denylist.len();
        denylist.extend(codes.iter().cloned());

        if denylist.len() != before {
            self.write_denylist(&denylist).await?;
        }
        Ok(())
    }

    async fn remove_from_denylist(&self, codes: &[CountryCode]) -> Result<(), PolicyError> {
        let mut denylist = self.get_denylist().await?;
        let before = denylist.len();
        for code in codes {
            denylist.remove(code);
        }

        if denylist.len() != before {
            self.write_denylist(&denylist).await?;
        }
        Ok(())
    }

    async fn get_toggle(&self, toggle: PolicyToggle) -> Result<bool, PolicyError> {
        let column = Self::column(toggle);
        let row = sqlx::query(&format!("SELECT {} FROM settings LIMIT 1", column))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PolicyError::StorageError(e.to_string()))?;

        Ok(row
            .map(|r| r.get::<i64, _>(column) != 0)
            .unwrap_or_else(|| toggle.default_value()))
    }

    async fn set_toggle(&self, toggle: PolicyToggle, enabled: bool) -> Result<(), PolicyError> {
        sqlx::query(&format!("UPDATE settings SET {} = ?", Self::column(toggle)))
            .bind(enabled as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| PolicyError::StorageError(e.to_string()))?;
        Ok(())
    }
}
