use anyhow::{anyhow, Context, Result};
use chrono::{SubsecRound, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime},
    models::CapturedResponse,
};

fn row_to_captured_response(row: &Row) -> Result<CapturedResponse> {
    let captured_at: String = row.get("captured_at")?;

    Ok(CapturedResponse {
        id: row.get("id")?,
        raw_reply: row.get("raw_reply")?,
        source_image: row.get("source_image")?,
        captured_at: parse_datetime(&captured_at, "captured_at")?,
    })
}

impl Database {
    /// Append a capture to the log and return the stored row.
    ///
    /// The timestamp never goes backwards relative to the newest existing row,
    /// even if the wall clock does.
    pub async fn insert_captured_response(
        &self,
        raw_reply: String,
        source_image: Vec<u8>,
    ) -> Result<CapturedResponse> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open insert transaction")?;

            let latest: Option<String> = tx
                .query_row(
                    "SELECT captured_at FROM captured_responses ORDER BY id DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;

            // Column precision is microseconds.
            let now = Utc::now().trunc_subsecs(6);
            let captured_at = match latest {
                Some(raw) => now.max(parse_datetime(&raw, "captured_at")?),
                None => now,
            };

            tx.execute(
                "INSERT INTO captured_responses (raw_reply, source_image, captured_at)
                 VALUES (?1, ?2, ?3)",
                params![raw_reply, source_image, format_datetime(&captured_at)],
            )
            .with_context(|| "failed to insert captured response")?;

            let id = tx.last_insert_rowid();
            tx.commit().context("failed to commit captured response")?;

            Ok(CapturedResponse {
                id,
                raw_reply,
                source_image,
                captured_at,
            })
        })
        .await
    }

    /// Every stored capture, newest first.
    pub async fn list_captured_responses(&self) -> Result<Vec<CapturedResponse>> {
        self.list_recent_captured_responses(None).await
    }

    pub async fn list_recent_captured_responses(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CapturedResponse>> {
        let limit = match limit {
            Some(value) => i64::try_from(value)
                .map_err(|_| anyhow!("limit {value} exceeds SQLite INTEGER range"))?,
            // SQLite treats a negative LIMIT as "no limit".
            None => -1,
        };

        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, raw_reply, source_image, captured_at
                 FROM captured_responses
                 ORDER BY captured_at DESC, id DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_captured_response(row)?);
            }

            Ok(records)
        })
        .await
    }

    pub async fn get_captured_response(&self, id: i64) -> Result<Option<CapturedResponse>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, raw_reply, source_image, captured_at
                 FROM captured_responses
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_captured_response(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn count_captured_responses(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM captured_responses", [], |row| {
                    row.get(0)
                })?;
            u64::try_from(count).map_err(|_| anyhow!("row count {count} is negative"))
        })
        .await
    }
}
