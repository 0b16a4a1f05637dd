//! Email storage repository.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite};
use tracing::debug;

use super::api::{DeleteEmailApi, GetEmailApi, PutEmailApi, QueryIndexApi, TransitionApi};
use super::index::{Cursor, IndexPage, PartitionKey, RawIndexEntry, format_time};
use super::model::{EmailRecord, EmailType};
use crate::{Error, Result};

/// Number of index entries returned per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Repository for email records and their month index.
pub struct SqliteEmailStore {
    pool: SqlitePool,
    page_size: u32,
}

impl SqliteEmailStore {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self {
            pool,
            page_size: DEFAULT_PAGE_SIZE,
        };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self {
            pool,
            page_size: DEFAULT_PAGE_SIZE,
        };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Sets the number of index entries returned per page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS emails (
                message_id TEXT PRIMARY KEY NOT NULL,
                email_type TEXT NOT NULL,
                time_updated TEXT NOT NULL,
                type_year_month TEXT NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                from_addresses TEXT NOT NULL DEFAULT '[]',
                to_addresses TEXT NOT NULL DEFAULT '[]',
                cc_addresses TEXT NOT NULL DEFAULT '[]',
                bcc_addresses TEXT NOT NULL DEFAULT '[]',
                reply_to_addresses TEXT NOT NULL DEFAULT '[]',
                text_body TEXT NOT NULL DEFAULT '',
                html_body TEXT NOT NULL DEFAULT ''
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        // Month index, newest first within a partition
        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_emails_type_year_month
            ON emails(type_year_month, time_updated DESC, message_id DESC)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl GetEmailApi for SqliteEmailStore {
    async fn get_email(&self, message_id: &str) -> Result<Option<EmailRecord>> {
        let row = sqlx::query(
            r"
            SELECT message_id, email_type, time_updated, type_year_month, subject,
                   from_addresses, to_addresses, cc_addresses, bcc_addresses,
                   reply_to_addresses, text_body, html_body
            FROM emails
            WHERE message_id = ?
            ",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_email).transpose()
    }
}

impl PutEmailApi for SqliteEmailStore {
    async fn put_email(&self, email: &EmailRecord) -> Result<()> {
        insert_email(&self.pool, email).await?;
        debug!(message_id = %email.message_id(), "Stored email");
        Ok(())
    }
}

impl DeleteEmailApi for SqliteEmailStore {
    async fn delete_email(&self, message_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM emails WHERE message_id = ?")
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl TransitionApi for SqliteEmailStore {
    async fn transition(&self, draft_id: &str, sent: &EmailRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM emails WHERE message_id = ? AND email_type = ?")
            .bind(draft_id)
            .bind(EmailType::Draft.as_str())
            .execute(&mut *tx)
            .await?;

        // Dropping the transaction rolls it back
        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound(format!("draft {draft_id}")));
        }

        insert_email(&mut *tx, sent).await?;
        tx.commit().await?;

        debug!(draft_id, sent_id = %sent.message_id(), "Replaced draft with sent email");
        Ok(())
    }
}

impl QueryIndexApi for SqliteEmailStore {
    async fn query_index(
        &self,
        partition: &PartitionKey,
        start_after: Option<&Cursor>,
    ) -> Result<IndexPage> {
        let page_size = usize::try_from(self.page_size).unwrap_or(usize::MAX);
        // One extra row tells whether another page follows
        let limit = i64::from(self.page_size) + 1;

        let rows = match start_after {
            None => {
                sqlx::query(
                    r"
                    SELECT message_id, email_type, time_updated, type_year_month
                    FROM emails
                    WHERE type_year_month = ?
                    ORDER BY time_updated DESC, message_id DESC
                    LIMIT ?
                    ",
                )
                .bind(partition.to_string())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            Some(cursor) => {
                sqlx::query(
                    r"
                    SELECT message_id, email_type, time_updated, type_year_month
                    FROM emails
                    WHERE type_year_month = ?
                      AND (time_updated < ? OR (time_updated = ? AND message_id < ?))
                    ORDER BY time_updated DESC, message_id DESC
                    LIMIT ?
                    ",
                )
                .bind(partition.to_string())
                .bind(cursor.time_updated())
                .bind(cursor.time_updated())
                .bind(cursor.message_id())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut entries = rows
            .iter()
            .map(row_to_index_entry)
            .collect::<Result<Vec<_>>>()?;

        let last_evaluated = if entries.len() > page_size {
            entries.truncate(page_size);
            entries.last().map(Cursor::from_entry)
        } else {
            None
        };

        Ok(IndexPage {
            entries,
            last_evaluated,
        })
    }
}

/// Inserts a record, rejecting an identifier that is already stored.
async fn insert_email<'e, E>(executor: E, email: &EmailRecord) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let message_id = email.message_id().to_owned();

    sqlx::query(
        r"
        INSERT INTO emails
            (message_id, email_type, time_updated, type_year_month, subject,
             from_addresses, to_addresses, cc_addresses, bcc_addresses,
             reply_to_addresses, text_body, html_body)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(message_id.clone())
    .bind(email.email_type().as_str())
    .bind(format_time(&email.index.time_updated))
    .bind(email.partition_key().to_string())
    .bind(email.subject.clone())
    .bind(serde_json::to_string(&email.from)?)
    .bind(serde_json::to_string(&email.to)?)
    .bind(serde_json::to_string(&email.cc)?)
    .bind(serde_json::to_string(&email.bcc)?)
    .bind(serde_json::to_string(&email.reply_to)?)
    .bind(email.text.clone())
    .bind(email.html.clone())
    .execute(executor)
    .await
    .map_err(|e| reject_duplicate(e, &message_id))?;

    Ok(())
}

fn reject_duplicate(err: sqlx::Error, message_id: &str) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return Error::InvalidInput(format!("email already exists: {message_id}"));
        }
    }
    Error::Database(err)
}

fn text_column(row: &SqliteRow, column: &str) -> Result<String> {
    row.try_get::<String, _>(column)
        .map_err(|e| Error::Decode(format!("column {column}: {e}")))
}

fn address_column(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let raw = text_column(row, column)?;
    serde_json::from_str(&raw).map_err(|e| Error::Decode(format!("column {column}: {e}")))
}

fn row_to_index_entry(row: &SqliteRow) -> Result<RawIndexEntry> {
    Ok(RawIndexEntry {
        message_id: text_column(row, "message_id")?,
        email_type: text_column(row, "email_type")?,
        time_updated: text_column(row, "time_updated")?,
        type_year_month: text_column(row, "type_year_month")?,
    })
}

fn row_to_email(row: &SqliteRow) -> Result<EmailRecord> {
    Ok(EmailRecord {
        index: row_to_index_entry(row)?.into_time_index()?,
        subject: text_column(row, "subject")?,
        from: address_column(row, "from_addresses")?,
        to: address_column(row, "to_addresses")?,
        cc: address_column(row, "cc_addresses")?,
        bcc: address_column(row, "bcc_addresses")?,
        reply_to: address_column(row, "reply_to_addresses")?,
        text: text_column(row, "text_body")?,
        html: text_column(row, "html_body")?,
    })
}
