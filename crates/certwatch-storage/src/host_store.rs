use anyhow::Result;
use certwatch_common::types::{CertificateRecord, CertificateView, MonitoredHost};
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const HOSTS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS hosts (
    id TEXT PRIMARY KEY,
    hostname TEXT NOT NULL UNIQUE,
    reachable INTEGER NOT NULL DEFAULT 0,
    last_checked_at INTEGER,
    last_reachable_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_hosts_hostname ON hosts(hostname);
";

// The unique index on host_id is load-bearing: a second record for the same
// host must fail the transaction rather than commit silently.
const CERTIFICATES_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS certificates (
    id TEXT PRIMARY KEY,
    host_id TEXT NOT NULL,
    serial_number TEXT NOT NULL,
    expires_at INTEGER NOT NULL,
    retrieved_at INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_certificates_host_id ON certificates(host_id);
CREATE INDEX IF NOT EXISTS idx_certificates_expires_at ON certificates(expires_at);
";

const HOST_COLUMNS: &str =
    "id, hostname, reachable, last_checked_at, last_reachable_at, created_at, updated_at";

pub struct HostStore {
    conn: Mutex<Connection>,
    _db_path: PathBuf,
}

impl HostStore {
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("certwatch.db");
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(HOSTS_SCHEMA)?;
        conn.execute_batch(CERTIFICATES_SCHEMA)?;
        tracing::info!(path = %db_path.display(), "Initialized host store");
        Ok(Self {
            conn: Mutex::new(conn),
            _db_path: db_path,
        })
    }

    // ---- hosts CRUD ----

    pub fn insert_host(&self, hostname: &str) -> Result<MonitoredHost> {
        let conn = self.conn.lock().unwrap();
        let id = certwatch_common::id::next_id();
        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO hosts (id, hostname, reachable, created_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?4)",
            rusqlite::params![id, hostname, now, now],
        )?;
        drop(conn);
        self.get_host_by_id(&id)
            .and_then(|opt| opt.ok_or_else(|| anyhow::anyhow!("Failed to read inserted host")))
    }

    /// Insert several hosts in one transaction. A uniqueness violation on
    /// any hostname rolls back the whole batch.
    pub fn insert_hosts_batch(&self, hostnames: &[String]) -> Result<Vec<MonitoredHost>> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().timestamp();
        let mut ids = Vec::with_capacity(hostnames.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO hosts (id, hostname, reachable, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?4)",
            )?;
            for hostname in hostnames {
                let id = certwatch_common::id::next_id();
                stmt.execute(rusqlite::params![id, hostname, now, now])?;
                ids.push(id);
            }
        }
        tx.commit()?;
        drop(conn);

        let mut hosts = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(h) = self.get_host_by_id(id)? {
                hosts.push(h);
            }
        }
        Ok(hosts)
    }

    /// All hosts in stable hostname order. This is also the order one
    /// reconciliation run walks them in.
    pub fn list_hosts(&self) -> Result<Vec<MonitoredHost>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {HOST_COLUMNS} FROM hosts ORDER BY hostname"
        ))?;
        let rows = stmt.query_map([], |row| Ok(Self::row_to_host(row)))?;
        let mut hosts = Vec::new();
        for row in rows {
            hosts.push(row??);
        }
        Ok(hosts)
    }

    pub fn get_host_by_id(&self, id: &str) -> Result<Option<MonitoredHost>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {HOST_COLUMNS} FROM hosts WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map(rusqlite::params![id], |row| Ok(Self::row_to_host(row)))?;
        match rows.next() {
            Some(Ok(Ok(h))) => Ok(Some(h)),
            Some(Ok(Err(e))) => Err(e),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn get_host_by_hostname(&self, hostname: &str) -> Result<Option<MonitoredHost>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {HOST_COLUMNS} FROM hosts WHERE hostname = ?1"
        ))?;
        let mut rows =
            stmt.query_map(rusqlite::params![hostname], |row| Ok(Self::row_to_host(row)))?;
        match rows.next() {
            Some(Ok(Ok(h))) => Ok(Some(h)),
            Some(Ok(Err(e))) => Err(e),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Delete a host and its certificate record together. No ON DELETE
    /// CASCADE in the schema; the cascade is explicit so a failure on either
    /// statement rolls back both.
    pub fn delete_host(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM certificates WHERE host_id = ?1",
            rusqlite::params![id],
        )?;
        let deleted = tx.execute("DELETE FROM hosts WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    pub fn count_hosts(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM hosts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_unreachable_hosts(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM hosts WHERE reachable = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ---- probe outcome application ----

    /// Fold a successful probe into storage: reachability fields and the
    /// replacement certificate record commit as one unit, all stamped with
    /// the same `now`. Returns false when the host no longer exists (deleted
    /// under a concurrent trigger), in which case nothing is written.
    pub fn mark_probe_success(
        &self,
        host_id: &str,
        serial_number: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        let ts = now.timestamp();
        let updated = tx.execute(
            "UPDATE hosts SET reachable = 1, last_checked_at = ?1, last_reachable_at = ?1, updated_at = ?1
             WHERE id = ?2",
            rusqlite::params![ts, host_id],
        )?;
        if updated == 0 {
            return Ok(false);
        }
        tx.execute(
            "DELETE FROM certificates WHERE host_id = ?1",
            rusqlite::params![host_id],
        )?;
        let id = certwatch_common::id::next_id();
        tx.execute(
            "INSERT INTO certificates (id, host_id, serial_number, expires_at, retrieved_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![id, host_id, serial_number, expires_at.timestamp(), ts, ts, ts],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Fold a failed probe into storage: only the reachability fields move.
    /// An existing certificate record stays as the last-known value.
    pub fn mark_probe_failure(&self, host_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let ts = now.timestamp();
        let updated = conn.execute(
            "UPDATE hosts SET reachable = 0, last_checked_at = ?1, updated_at = ?1 WHERE id = ?2",
            rusqlite::params![ts, host_id],
        )?;
        Ok(updated > 0)
    }

    // ---- certificates ----

    pub fn get_certificate_for_host(&self, host_id: &str) -> Result<Option<CertificateRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, host_id, serial_number, expires_at, retrieved_at, created_at, updated_at
             FROM certificates WHERE host_id = ?1",
        )?;
        let mut rows = stmt.query_map(rusqlite::params![host_id], |row| {
            Ok(Self::row_to_certificate(row))
        })?;
        match rows.next() {
            Some(Ok(Ok(c))) => Ok(Some(c)),
            Some(Ok(Err(e))) => Err(e),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Current certificate inventory joined with hostnames, soonest expiry
    /// first. `days_until_expiry` is floored at zero for already-expired
    /// certificates.
    pub fn list_certificates(&self) -> Result<Vec<CertificateView>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.host_id, h.hostname, c.serial_number, c.expires_at, c.retrieved_at
             FROM certificates c
             INNER JOIN hosts h ON h.id = c.host_id
             ORDER BY c.expires_at ASC",
        )?;
        let now = Utc::now();
        let rows = stmt.query_map([], |row| {
            let expires: i64 = row.get(4)?;
            let retrieved: i64 = row.get(5)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                expires,
                retrieved,
            ))
        })?;
        let mut views = Vec::new();
        for row in rows {
            let (id, host_id, hostname, serial_number, expires, retrieved) = row?;
            let expires_at = DateTime::from_timestamp(expires, 0).unwrap_or_default();
            let days_until_expiry = (expires_at - now).num_days().max(0);
            views.push(CertificateView {
                id,
                host_id,
                hostname,
                serial_number,
                expires_at,
                days_until_expiry,
                retrieved_at: DateTime::from_timestamp(retrieved, 0).unwrap_or_default(),
            });
        }
        Ok(views)
    }

    pub fn count_certificates(&self) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM certificates", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_expiring_within(&self, days: i64) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let threshold = (Utc::now() + Duration::days(days)).timestamp();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM certificates WHERE expires_at <= ?1",
            rusqlite::params![threshold],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Retrieval time of the most recently captured certificate record, used
    /// as "when did a scan last find anything".
    pub fn latest_retrieved_at(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().unwrap();
        let latest: Option<i64> = conn.query_row(
            "SELECT MAX(retrieved_at) FROM certificates",
            [],
            |row| row.get(0),
        )?;
        Ok(latest.and_then(|ts| DateTime::from_timestamp(ts, 0)))
    }

    // ---- Row mappers ----

    fn row_to_host(row: &rusqlite::Row) -> Result<MonitoredHost> {
        let reachable_int: i32 = row.get(2)?;
        let last_checked: Option<i64> = row.get(3)?;
        let last_reachable: Option<i64> = row.get(4)?;
        let created: i64 = row.get(5)?;
        let updated: i64 = row.get(6)?;
        Ok(MonitoredHost {
            id: row.get(0)?,
            hostname: row.get(1)?,
            reachable: reachable_int != 0,
            last_checked_at: last_checked.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            last_reachable_at: last_reachable.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            created_at: DateTime::from_timestamp(created, 0).unwrap_or_default(),
            updated_at: DateTime::from_timestamp(updated, 0).unwrap_or_default(),
        })
    }

    fn row_to_certificate(row: &rusqlite::Row) -> Result<CertificateRecord> {
        let expires: i64 = row.get(3)?;
        let retrieved: i64 = row.get(4)?;
        let created: i64 = row.get(5)?;
        let updated: i64 = row.get(6)?;
        Ok(CertificateRecord {
            id: row.get(0)?,
            host_id: row.get(1)?,
            serial_number: row.get(2)?,
            expires_at: DateTime::from_timestamp(expires, 0).unwrap_or_default(),
            retrieved_at: DateTime::from_timestamp(retrieved, 0).unwrap_or_default(),
            created_at: DateTime::from_timestamp(created, 0).unwrap_or_default(),
            updated_at: DateTime::from_timestamp(updated, 0).unwrap_or_default(),
        })
    }
}
