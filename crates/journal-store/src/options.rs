use anyhow::Result;
use async_trait::async_trait;
use journal_core::{JournalError, JournalResult, KeyValueStore};

use crate::db::JournalDb;

/// `KeyValueStore` over the `custom_options` table.
pub struct SqliteOptionStore {
    db: JournalDb,
}

impl SqliteOptionStore {
    pub fn new(db: JournalDb) -> Self {
        Self { db }
    }

    async fn load(&self, scope: &str, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM custom_options WHERE scope = ? AND key = ?")
                .bind(scope)
                .bind(key)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(row.map(|(v,)| v))
    }

    async fn save(&self, scope: &str, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO custom_options (scope, key, value, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(scope, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(scope)
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn load_scope(&self, scope: &str) -> Result<Vec<(String, String)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM custom_options WHERE scope = ? ORDER BY key")
                .bind(scope)
                .fetch_all(self.db.pool())
                .await?;
        Ok(rows)
    }
}

#[async_trait]
impl KeyValueStore for SqliteOptionStore {
    async fn get(&self, scope: &str, key: &str) -> JournalResult<Option<String>> {
        self.load(scope, key).await.map_err(JournalError::database)
    }

    async fn set(&self, scope: &str, key: &str, value: &str) -> JournalResult<()> {
        self.save(scope, key, value).await.map_err(JournalError::database)
    }

    async fn list(&self, scope: &str) -> JournalResult<Vec<(String, String)>> {
        self.load_scope(scope).await.map_err(JournalError::database)
    }
}

/// Which user-defined list an option belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Strategy,
    Tag,
}

impl OptionKind {
    fn key(&self) -> &'static str {
        match self {
            OptionKind::Strategy => "strategies",
            OptionKind::Tag => "tags",
        }
    }
}

impl std::str::FromStr for OptionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strategy" | "strategies" => Ok(OptionKind::Strategy),
            "tag" | "tags" => Ok(OptionKind::Tag),
            other => Err(format!("unknown option kind '{other}'")),
        }
    }
}

/// User-scoped custom strategy and tag lists, stored as JSON arrays.
pub struct CustomOptions<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> CustomOptions<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn scope(user: &str) -> String {
        format!("user:{}", user)
    }

    pub async fn list(&self, user: &str, kind: OptionKind) -> JournalResult<Vec<String>> {
        match self.store.get(&Self::scope(user), kind.key()).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Append a value unless an equal one (ignoring case) exists.
    /// Returns the resulting list.
    pub async fn add(&self, user: &str, kind: OptionKind, value: &str) -> JournalResult<Vec<String>> {
        let value = value.trim();
        if value.is_empty() {
            return Err(JournalError::InvalidData("option value must not be empty".into()));
        }

        let mut values = self.list(user, kind).await?;
        if !values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            values.push(value.to_string());
            let raw = serde_json::to_string(&values)?;
            self.store.set(&Self::scope(user), kind.key(), &raw).await?;
        }
        Ok(values)
    }

    pub async fn remove(&self, user: &str, kind: OptionKind, value: &str) -> JournalResult<Vec<String>> {
        let mut values = self.list(user, kind).await?;
        let before = values.len();
        values.retain(|v| !v.eq_ignore_ascii_case(value.trim()));
        if values.len() != before {
            let raw = serde_json::to_string(&values)?;
            self.store.set(&Self::scope(user), kind.key(), &raw).await?;
        }
        Ok(values)
    }
}
