// SQLite-backed inventory store

use std::path::Path;

use rusqlite::{params, Connection};
use stocktake_recon::model::CompositeKey;
use stocktake_recon::persist::{CountRecord, InventoryStore, MasterRecord, RESOLVED_LABELS};
use stocktake_recon::{PendingItem, StoreError};

use crate::error::IoError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS inventory_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    location TEXT NOT NULL,
    product_code TEXT NOT NULL,
    lot TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    system_qty REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (location, product_code, lot)
);

CREATE TABLE IF NOT EXISTS inventory_counts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL REFERENCES inventory_items(id),
    round INTEGER NOT NULL,        -- 1..=6
    quantity REAL NOT NULL,
    counted_by TEXT NOT NULL DEFAULT '',
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_counts_item ON inventory_counts (item_id);
"#;

const UPSERT_ITEM: &str = "
INSERT INTO inventory_items (location, product_code, lot, description, system_qty, status, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
ON CONFLICT (location, product_code, lot) DO UPDATE SET
    description = excluded.description,
    system_qty = excluded.system_qty,
    status = excluded.status,
    updated_at = excluded.updated_at
RETURNING id";

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, IoError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, IoError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, IoError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Count history of one item, oldest first.
    pub fn counts_for(&self, item_id: i64) -> Result<Vec<CountRecord>, IoError> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, round, quantity, counted_by FROM inventory_counts WHERE item_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![item_id], |row| {
            Ok(CountRecord {
                item_id: row.get(0)?,
                round: row.get(1)?,
                quantity: row.get(2)?,
                user: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Current status label of the item at `key`, if stored.
    pub fn status_of(&self, key: &CompositeKey) -> Result<Option<String>, IoError> {
        let mut stmt = self.conn.prepare(
            "SELECT status FROM inventory_items WHERE location = ?1 AND product_code = ?2 AND lot = ?3",
        )?;
        let mut rows = stmt.query(params![key.location, key.product, key.lot])?;
        let status = match rows.next()? {
            Some(row) => Some(row.get(0)?),
            None => None,
        };
        Ok(status)
    }
}

fn store_err(e: rusqlite::Error) -> StoreError {
    StoreError::new(e.to_string())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl InventoryStore for SqliteStore {
    fn pending_items(&self) -> Result<Vec<PendingItem>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, location, product_code, lot, description, system_qty, status
                 FROM inventory_items WHERE status NOT IN (?1, ?2) ORDER BY id",
            )
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![RESOLVED_LABELS[0], RESOLVED_LABELS[1]], |row| {
                Ok(PendingItem {
                    id: row.get(0)?,
                    key: CompositeKey {
                        location: row.get(1)?,
                        product: row.get(2)?,
                        lot: row.get(3)?,
                    },
                    description: row.get(4)?,
                    system_qty: row.get(5)?,
                    last_status: row.get(6)?,
                })
            })
            .map_err(store_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(store_err)
    }

    fn upsert_items(&mut self, masters: &[MasterRecord]) -> Result<Vec<(i64, CompositeKey)>, StoreError> {
        let stamp = now();
        let tx = self.conn.transaction().map_err(store_err)?;
        let mut saved = Vec::with_capacity(masters.len());
        {
            let mut stmt = tx.prepare(UPSERT_ITEM).map_err(store_err)?;
            for m in masters {
                let id: i64 = stmt
                    .query_row(
                        params![m.key.location, m.key.product, m.key.lot, m.description, m.system_qty, m.status, stamp],
                        |row| row.get(0),
                    )
                    .map_err(|e| StoreError::for_key(e.to_string(), m.key.clone()))?;
                saved.push((id, m.key.clone()));
            }
        }
        tx.commit().map_err(store_err)?;
        Ok(saved)
    }

    fn insert_counts(&mut self, counts: &[CountRecord]) -> Result<(), StoreError> {
        let stamp = now();
        let tx = self.conn.transaction().map_err(store_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO inventory_counts (item_id, round, quantity, counted_by, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(store_err)?;
            for c in counts {
                stmt.execute(params![c.item_id, c.round, c.quantity, c.user, stamp])
                    .map_err(store_err)?;
            }
        }
        tx.commit().map_err(store_err)
    }
}
