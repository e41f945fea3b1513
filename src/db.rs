use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::parser::assemble::DeviceRecord;
use crate::parser::processors::ProcessorRecord;
use crate::version::{Version, VersionRange};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Unable to create database directory {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS processors (
            id     INTEGER PRIMARY KEY,
            code   TEXT UNIQUE NOT NULL,
            label  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS devices (
            id           INTEGER PRIMARY KEY,
            model_name   TEXT NOT NULL,
            codename     TEXT UNIQUE NOT NULL,
            processor_id INTEGER REFERENCES processors(id)
        );

        CREATE TABLE IF NOT EXISTS os_versions (
            id     INTEGER PRIMARY KEY,
            name   TEXT NOT NULL DEFAULT 'ios',
            major  INTEGER NOT NULL,
            minor  INTEGER NOT NULL,
            patch  INTEGER NOT NULL,
            UNIQUE(major, minor, patch)
        );

        CREATE TABLE IF NOT EXISTS device_os (
            device_id     INTEGER NOT NULL REFERENCES devices(id),
            os_version_id INTEGER NOT NULL REFERENCES os_versions(id),
            UNIQUE(device_id, os_version_id)
        );
        CREATE INDEX IF NOT EXISTS idx_device_os_version ON device_os(os_version_id);

        DROP VIEW IF EXISTS v_os_model;
        CREATE VIEW v_os_model AS
            SELECT os.major, os.minor, os.patch, d.model_name, d.codename, p.label AS cpu
            FROM device_os dos
            JOIN devices d ON d.id = dos.device_id
            LEFT JOIN processors p ON p.id = d.processor_id
            JOIN os_versions os ON os.id = dos.os_version_id;
        ",
    )?;
    Ok(())
}

// ── Seeds ──

/// Chips of the first two models, named after their Samsung part numbers.
const EARLY_PROCESSORS: &[(&str, &str)] = &[
    ("S5L8900", "Samsung S5L8900"),
    ("S5L8920", "Samsung S5PC100"),
];

/// The iOS 10 release page has no version table; its point releases are listed here.
const IOS10_RELEASES: &[Version] = &[
    Version::new(10, 0, 1),
    Version::new(10, 0, 2),
    Version::new(10, 1, 0),
    Version::new(10, 1, 1),
    Version::new(10, 2, 0),
    Version::new(10, 2, 1),
    Version::new(10, 3, 0),
    Version::new(10, 3, 1),
    Version::new(10, 3, 2),
    Version::new(10, 3, 3),
    Version::new(10, 3, 4),
];

pub fn seed(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO processors (code, label) VALUES (?1, ?2)")?;
        for (code, label) in EARLY_PROCESSORS {
            stmt.execute(rusqlite::params![code, label])?;
        }
    }
    for v in IOS10_RELEASES {
        insert_version_if_absent(&tx, v)?;
    }
    tx.commit()?;
    Ok(())
}

// ── Processors ──

/// Idempotent on `code`; a second call updates the label.
pub fn upsert_processor(conn: &Connection, code: &str, label: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO processors (code, label) VALUES (?1, ?2)
         ON CONFLICT(code) DO UPDATE SET label = excluded.label",
        rusqlite::params![code, label],
    )?;
    info!("Adding/updating processor {} ({})", label, code);
    Ok(())
}

pub fn save_processors(conn: &Connection, rows: &[ProcessorRecord]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    for r in rows {
        upsert_processor(&tx, &r.code, &r.label)?;
    }
    tx.commit()?;
    Ok(rows.len())
}

// ── Versions ──

/// Returns whether a row was inserted.
pub fn insert_version_if_absent(conn: &Connection, v: &Version) -> Result<bool> {
    let n = conn.execute(
        "INSERT OR IGNORE INTO os_versions (major, minor, patch) VALUES (?1, ?2, ?3)",
        rusqlite::params![v.major, v.minor, v.patch],
    )?;
    Ok(n > 0)
}

pub fn save_versions(conn: &Connection, versions: &[Version]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    for v in versions {
        if insert_version_if_absent(&tx, v)? {
            inserted += 1;
        }
    }
    tx.commit()?;
    Ok(inserted)
}

pub fn fetch_versions(conn: &Connection) -> Result<Vec<(i64, Version)>> {
    let mut stmt = conn.prepare("SELECT id, major, minor, patch FROM os_versions ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, Version::new(row.get(1)?, row.get(2)?, row.get(3)?)))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Devices ──

/// Idempotent on `codename`. Links the device to every stored version inside
/// `supported` and returns how many versions that range covers.
pub fn upsert_device(
    conn: &Connection,
    model: &str,
    codename: &str,
    cpu_label: &str,
    supported: &VersionRange,
) -> Result<usize> {
    conn.execute(
        "INSERT INTO devices (model_name, codename) VALUES (?1, ?2)
         ON CONFLICT(codename) DO UPDATE SET model_name = excluded.model_name",
        rusqlite::params![model, codename],
    )?;
    let device_id: i64 = conn.query_row(
        "SELECT id FROM devices WHERE codename = ?1",
        [codename],
        |r| r.get(0),
    )?;

    // Processor labels are stored without the vendor prefix.
    let label = cpu_label.strip_prefix("Apple ").unwrap_or(cpu_label);
    let cpu_id: Option<i64> = conn
        .query_row("SELECT id FROM processors WHERE label = ?1", [label], |r| r.get(0))
        .optional()?;
    match cpu_id {
        Some(id) => {
            conn.execute(
                "UPDATE devices SET processor_id = ?1 WHERE id = ?2",
                rusqlite::params![id, device_id],
            )?;
            debug!("setting cpu '{}' for device '{}' ({})", cpu_label, model, codename);
        }
        None => warn!("unknown cpu '{}' for device '{}' ({})", cpu_label, model, codename),
    }

    let mut link = conn.prepare(
        "INSERT OR IGNORE INTO device_os (device_id, os_version_id) VALUES (?1, ?2)",
    )?;
    let mut linked = 0;
    for (version_id, v) in fetch_versions(conn)? {
        if supported.contains(&v) {
            link.execute(rusqlite::params![device_id, version_id])?;
            linked += 1;
        }
    }
    Ok(linked)
}

pub struct DeviceCounts {
    pub devices: usize,
    pub links: usize,
}

/// One database row per codename of each record.
pub fn save_devices(conn: &Connection, records: &[DeviceRecord]) -> Result<DeviceCounts> {
    let tx = conn.unchecked_transaction()?;
    let mut counts = DeviceCounts { devices: 0, links: 0 };
    for d in records {
        let supported = d.supported();
        for codename in &d.codenames {
            counts.links += upsert_device(&tx, &d.model_name, codename, &d.processor, &supported)?;
            counts.devices += 1;
        }
    }
    tx.commit()?;
    Ok(counts)
}

// ── Stats ──

pub struct Stats {
    pub processors: usize,
    pub devices: usize,
    pub devices_without_cpu: usize,
    pub versions: usize,
    pub links: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    Ok(Stats {
        processors: count("SELECT COUNT(*) FROM processors")?,
        devices: count("SELECT COUNT(*) FROM devices")?,
        devices_without_cpu: count("SELECT COUNT(*) FROM devices WHERE processor_id IS NULL")?,
        versions: count("SELECT COUNT(*) FROM os_versions")?,
        links: count("SELECT COUNT(*) FROM device_os")?,
    })
}
