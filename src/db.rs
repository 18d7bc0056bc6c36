//! SQLite checkpoint of finished products, so an interrupted run resumes
//! without scraping them again.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::ScrapeError;
use crate::record::{FieldValue, ProductRecord, ProductUrl};

pub fn connect(path: &Path) -> Result<Connection, ScrapeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<(), ScrapeError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS products (
            url          TEXT PRIMARY KEY,
            record       TEXT NOT NULL,
            complete     BOOLEAN NOT NULL,
            recorded_at  TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

pub fn load_record(conn: &Connection, url: &ProductUrl) -> Result<Option<ProductRecord>, ScrapeError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT record FROM products WHERE url = ?1",
            [url.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    raw.map(|json| {
        serde_json::from_str(&json).map_err(|source| ScrapeError::CorruptCheckpoint {
            url: url.to_string(),
            source,
        })
    })
    .transpose()
}

pub fn save_record(conn: &Connection, record: &ProductRecord) -> Result<(), ScrapeError> {
    let json = serde_json::to_string(record).map_err(|source| ScrapeError::CorruptCheckpoint {
        url: record.url().to_string(),
        source,
    })?;
    // every field either extracted or legitimately absent
    let complete = record
        .fields()
        .all(|(_, v)| v.is_present() || *v == FieldValue::NotApplicable);
    conn.execute(
        "INSERT OR REPLACE INTO products (url, record, complete, recorded_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            record.url().as_str(),
            json,
            complete,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn clear(conn: &Connection) -> Result<usize, ScrapeError> {
    Ok(conn.execute("DELETE FROM products", [])?)
}

pub struct CheckpointStats {
    pub total: usize,
    pub complete: usize,
    pub first_recorded: Option<String>,
    pub last_recorded: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<CheckpointStats, ScrapeError> {
    let stats = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(complete), 0), MIN(recorded_at), MAX(recorded_at) FROM products",
        [],
        |row| {
            Ok(CheckpointStats {
                total: row.get::<_, i64>(0)? as usize,
                complete: row.get::<_, i64>(1)? as usize,
                first_recorded: row.get(2)?,
                last_recorded: row.get(3)?,
            })
        },
    )?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, RecordBuilder};

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn url(pid: u32) -> ProductUrl {
        ProductUrl::canonicalize(&format!("https://shop.test/p?pid={pid}"), None).unwrap()
    }

    #[test]
    fn saved_record_loads_back_identically() {
        let conn = memory();
        let mut b = RecordBuilder::new(url(1));
        b.set(Field::Name, FieldValue::Text("Hoodie".into()));
        b.set(Field::AvailableSizes, FieldValue::List(vec!["S".into(), "M".into()]));
        b.set(Field::FitSizing, FieldValue::NotApplicable);
        let record = b.build();

        save_record(&conn, &record).unwrap();
        assert_eq!(load_record(&conn, &url(1)).unwrap(), Some(record));
        assert_eq!(load_record(&conn, &url(2)).unwrap(), None);
    }

    #[test]
    fn stats_and_clear() {
        let conn = memory();
        save_record(&conn, &RecordBuilder::new(url(1)).build()).unwrap();
        save_record(&conn, &RecordBuilder::new(url(2)).build()).unwrap();
        // same url overwrites
        save_record(&conn, &RecordBuilder::new(url(2)).build()).unwrap();

        let s = get_stats(&conn).unwrap();
        assert_eq!(s.total, 2);
        assert_eq!(s.complete, 0);
        assert!(s.first_recorded.is_some());

        assert_eq!(clear(&conn).unwrap(), 2);
        assert_eq!(get_stats(&conn).unwrap().total, 0);
    }

    #[test]
    fn corrupt_entry_is_reported() {
        let conn = memory();
        conn.execute(
            "INSERT INTO products (url, record, complete, recorded_at) VALUES (?1, 'not json', 0, 'now')",
            [url(7).as_str()],
        )
        .unwrap();
        assert!(matches!(
            load_record(&conn, &url(7)),
            Err(ScrapeError::CorruptCheckpoint { .. })
        ));
    }
}
