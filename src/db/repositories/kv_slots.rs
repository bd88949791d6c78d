use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{helpers::parse_datetime, Database};
use crate::timer::KeyValueStore;

/// A stored slot together with when it was last written.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotRecord {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

fn row_to_slot(row: &Row) -> Result<SlotRecord, rusqlite::Error> {
    let updated_at: String = row.get("updated_at")?;

    Ok(SlotRecord {
        key: row.get("key")?,
        value: row.get("value")?,
        updated_at: parse_datetime(&updated_at, "updated_at").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    e.to_string(),
                )),
            )
        })?,
    })
}

impl Database {
    pub async fn get_slot(&self, key: String) -> Result<Option<String>> {
        self.execute(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_slots WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    pub async fn get_slot_record(&self, key: String) -> Result<Option<SlotRecord>> {
        self.execute(move |conn| {
            let mut stmt =
                conn.prepare("SELECT key, value, updated_at FROM kv_slots WHERE key = ?1")?;
            let record = stmt.query_row(params![key], row_to_slot).optional()?;
            Ok(record)
        })
        .await
    }

    /// Upserts a slot; the write is durable once this returns.
    pub async fn set_slot(&self, key: String, value: String) -> Result<()> {
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO kv_slots (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_slot(key.to_string()).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_slot(key.to_string(), value.to_string()).await
    }
}
