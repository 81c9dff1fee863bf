use anyhow::{bail, Result};
use journal_core::{Journal, JournalInput, RawUploadedFile, TradeSession};

use crate::db::JournalDb;
use crate::models::{JournalRow, SessionRow};

const JOURNAL_COLUMNS: &str = "id, name, description, broker, prop_firm, account_size, created_at";
const SESSION_COLUMNS: &str = "id, journal_id, raw_upload_id, metrics, ai_strengths, ai_mistakes, \
     ai_fixes, ai_key_insight, created_at";

impl JournalDb {
    pub async fn create_journal(&self, input: &JournalInput) -> Result<Journal> {
        let name = input.name.trim();
        if name.is_empty() {
            bail!("journal name must not be empty");
        }

        let result = sqlx::query(
            r#"
            INSERT INTO journals (name, description, broker, prop_firm, account_size)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(&input.description)
        .bind(&input.broker)
        .bind(&input.prop_firm)
        .bind(input.account_size)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        match self.get_journal(id).await? {
            Some(journal) => Ok(journal),
            None => bail!("journal {} vanished after insert", id),
        }
    }

    pub async fn get_journal(&self, id: i64) -> Result<Option<Journal>> {
        let row = sqlx::query_as::<_, JournalRow>(&format!(
            "SELECT {} FROM journals WHERE id = ?",
            JOURNAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Journal::from))
    }

    pub async fn list_journals(&self) -> Result<Vec<Journal>> {
        let rows = sqlx::query_as::<_, JournalRow>(&format!(
            "SELECT {} FROM journals ORDER BY id",
            JOURNAL_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Journal::from).collect())
    }

    pub async fn get_session(&self, id: i64) -> Result<Option<TradeSession>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM trade_sessions WHERE id = ?",
            SESSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(TradeSession::try_from).transpose()
    }

    /// Sessions of a journal, newest first.
    pub async fn list_sessions(&self, journal_id: i64) -> Result<Vec<TradeSession>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM trade_sessions WHERE journal_id = ? ORDER BY id DESC",
            SESSION_COLUMNS
        ))
        .bind(journal_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TradeSession::try_from).collect()
    }

    pub async fn get_raw_upload(&self, id: i64) -> Result<Option<RawUploadedFile>> {
        let row: Option<(i64, i64, String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, journal_id, file_name, content_sha256, headers, original_rows, mapping \
             FROM raw_uploads WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        let Some((id, journal_id, file_name, content_sha256, headers, rows, mapping)) = row else {
            return Ok(None);
        };

        Ok(Some(RawUploadedFile {
            id: Some(id),
            journal_id,
            file_name,
            content_sha256,
            headers: serde_json::from_str(&headers)?,
            original_rows: serde_json::from_str(&rows)?,
            mapping: serde_json::from_str(&mapping)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::{CanonicalField, ColumnMapping, TradeRepository};
    use std::collections::HashMap;

    async fn setup_test_db() -> JournalDb {
        JournalDb::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list_journals() {
        let db = setup_test_db().await;

        let journal = db
            .create_journal(&JournalInput {
                name: "  Eval account ".into(),
                broker: Some("Tradovate".into()),
                prop_firm: Some("Apex".into()),
                account_size: Some(50_000.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(journal.name, "Eval account");
        assert_eq!(journal.account_size, Some(50_000.0));
        assert!(journal.created_at.is_some());

        db.create_journal(&JournalInput {
            name: "Swing".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let all = db.list_journals().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, journal.id);
        assert!(db.get_journal(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = setup_test_db().await;
        assert!(db.create_journal(&JournalInput::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_raw_upload_round_trip() {
        let db = setup_test_db().await;
        let journal = db
            .create_journal(&JournalInput {
                name: "J".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut mapping = ColumnMapping::new();
        mapping.insert(CanonicalField::Symbol, "Ticker");
        let upload = RawUploadedFile {
            id: None,
            journal_id: journal.id,
            file_name: "export.csv".into(),
            content_sha256: "deadbeef".into(),
            headers: vec!["Ticker".into()],
            original_rows: vec![HashMap::from([("Ticker".to_string(), "NQ".to_string())])],
            mapping,
        };
        let id = db.save_raw_upload(&upload).await.unwrap();

        let loaded = db.get_raw_upload(id).await.unwrap().unwrap();
        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.mapping, upload.mapping);
        assert_eq!(loaded.original_rows, upload.original_rows);

        let sessions = db.list_sessions(journal.id).await.unwrap();
        assert!(sessions.is_empty());
    }
}
