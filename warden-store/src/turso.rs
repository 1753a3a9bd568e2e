//! libSQL / Turso allowlist store.
//!
//! Schema:
//!
//! ```text
//! trusted_ips (
//!     ip          TEXT PRIMARY KEY,   -- canonical address
//!     description TEXT,
//!     created_at  INTEGER NOT NULL    -- unix seconds, UTC
//! )
//! ```

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use libsql::{params, Connection, Database, Row};
use tracing::{debug, info, instrument};

use warden_core::error::{Result, WardenError};
use warden_core::traits::{AllowlistStore, TrustedIpSource};
use warden_core::types::{normalize_description, normalize_ip, AllowlistEntry};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS trusted_ips (
    ip          TEXT PRIMARY KEY,
    description TEXT,
    created_at  INTEGER NOT NULL
)";

const SELECT_ENTRY: &str = "SELECT ip, description, created_at FROM trusted_ips";

/// Allowlist store backed by a libSQL database.
///
/// Holds a single connection; libSQL connections are cheap to clone and
/// safe to share between tasks.
pub struct LibsqlStore {
    // Kept alive for the lifetime of the connection.
    _db: Database,
    conn: Connection,
}

impl LibsqlStore {
    /// Connects to a remote Turso database and ensures the schema exists.
    pub async fn connect_remote(url: impl Into<String>, auth_token: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let db = libsql::Builder::new_remote(url.clone(), auth_token.into())
            .build()
            .await
            .map_err(storage_error)?;
        info!(url = %url, "Connected to remote allowlist database");
        Self::from_database(db).await
    }

    /// Wraps an already-built database and ensures the schema exists.
    pub async fn from_database(db: Database) -> Result<Self> {
        let conn = db.connect().map_err(storage_error)?;
        conn.execute(CREATE_TABLE, ()).await.map_err(storage_error)?;
        Ok(Self { _db: db, conn })
    }

    async fn query_entries(&self, sql: &str, ip: Option<&str>) -> Result<Vec<AllowlistEntry>> {
        let mut rows = match ip {
            Some(ip) => self.conn.query(sql, params![ip]).await,
            None => self.conn.query(sql, ()).await,
        }
        .map_err(storage_error)?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_error)? {
            entries.push(entry_from_row(&row)?);
        }
        Ok(entries)
    }
}

fn storage_error(err: libsql::Error) -> WardenError {
    WardenError::StorageError(err.to_string())
}

fn entry_from_row(row: &Row) -> Result<AllowlistEntry> {
    let ip: String = row.get(0).map_err(|e| WardenError::MalformedRow(e.to_string()))?;
    let description: Option<String> = row.get(1).map_err(|e| WardenError::MalformedRow(e.to_string()))?;
    let created_at: i64 = row.get(2).map_err(|e| WardenError::MalformedRow(e.to_string()))?;

    Ok(AllowlistEntry {
        ip,
        description,
        created_at: timestamp_to_utc(created_at)?,
    })
}

fn timestamp_to_utc(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| WardenError::MalformedRow(format!("created_at out of range: {}", secs)))
}

#[async_trait]
impl TrustedIpSource for LibsqlStore {
    async fn fetch_trusted_ips(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query("SELECT ip FROM trusted_ips", ())
            .await
            .map_err(storage_error)?;

        let mut ips = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_error)? {
            let ip: String = row.get(0).map_err(|e| WardenError::MalformedRow(e.to_string()))?;
            ips.push(ip);
        }
        Ok(ips)
    }
}

#[async_trait]
impl AllowlistStore for LibsqlStore {
    async fn list_entries(&self) -> Result<Vec<AllowlistEntry>> {
        let sql = format!("{} ORDER BY created_at DESC, ip ASC", SELECT_ENTRY);
        self.query_entries(&sql, None).await
    }

    async fn get_entry(&self, ip: &str) -> Result<Option<AllowlistEntry>> {
        let ip = normalize_ip(ip)?;
        let sql = format!("{} WHERE ip = ?1", SELECT_ENTRY);
        Ok(self.query_entries(&sql, Some(&ip)).await?.into_iter().next())
    }

    #[instrument(skip(self, entry), fields(ip = %entry.ip))]
    async fn upsert_entry(&self, entry: AllowlistEntry) -> Result<AllowlistEntry> {
        let ip = normalize_ip(&entry.ip)?;
        let description = normalize_description(entry.description)?;

        self.conn
            .execute(
                "INSERT INTO trusted_ips (ip, description, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (ip) DO UPDATE SET description = excluded.description",
                params![ip.clone(), description, entry.created_at.timestamp()],
            )
            .await
            .map_err(storage_error)?;

        debug!("Upserted trusted IP");
        self.get_entry(&ip)
            .await?
            .ok_or_else(|| WardenError::InternalError(format!("upserted row vanished: {}", ip)))
    }

    #[instrument(skip(self, description))]
    async fn update_description(&self, ip: &str, description: Option<String>) -> Result<AllowlistEntry> {
        let ip = normalize_ip(ip)?;
        let description = normalize_description(description)?;

        let changed = self
            .conn
            .execute(
                "UPDATE trusted_ips SET description = ?1 WHERE ip = ?2",
                params![description, ip.clone()],
            )
            .await
            .map_err(storage_error)?;

        if changed == 0 {
            return Err(WardenError::EntryNotFound(ip));
        }

        self.get_entry(&ip)
            .await?
            .ok_or_else(|| WardenError::EntryNotFound(ip))
    }

    #[instrument(skip(self))]
    async fn delete_entry(&self, ip: &str) -> Result<bool> {
        let ip = normalize_ip(ip)?;
        let removed = self
            .conn
            .execute("DELETE FROM trusted_ips WHERE ip = ?1", params![ip])
            .await
            .map_err(storage_error)?;
        Ok(removed > 0)
    }
}
