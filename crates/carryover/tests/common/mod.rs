//! Common fixtures for carryover integration tests.

#![allow(dead_code)]

use carryover::{SqliteStore, sql};
use rusqlite::{Connection, params};

/// Collection modification time written by the fixtures.
pub const INITIAL_MOD: i64 = 1_000_000;

pub const SOURCE_TYPE: &str = "Domino Text Input-43bf8";
pub const TARGET_TYPE: &str = "Domino Recognition and Stroke Order-6c462";
pub const SOURCE_MID: i64 = 1001;
pub const TARGET_MID: i64 = 2002;

/// Builder for in-memory collections.
pub struct CollectionBuilder {
    conn: Connection,
    split: bool,
    models: serde_json::Map<String, serde_json::Value>,
}

impl CollectionBuilder {
    /// Schema 11 collection, note types in `col.models`.
    pub fn legacy() -> Self {
        Self::create(false)
    }

    /// Collection with `notetypes`, `fields` and `templates` tables.
    pub fn split() -> Self {
        Self::create(true)
    }

    fn create(split: bool) -> Self {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(sql::SCHEMA).unwrap();
        if split {
            conn.execute_batch(sql::NOTETYPE_TABLES).unwrap();
        }
        conn.execute(
            "INSERT INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
             VALUES (1, 0, ?, 0, 11, 0, 0, 0, '{}', '', '{}', '{}', '{}')",
            [INITIAL_MOD],
        )
        .unwrap();
        Self {
            conn,
            split,
            models: serde_json::Map::new(),
        }
    }

    /// Add a note type.
    pub fn note_type(mut self, id: i64, name: &str, fields: &[&str], templates: &[&str]) -> Self {
        if self.split {
            self.conn
                .execute(
                    "INSERT INTO notetypes (id, name, mtime_secs, usn, config) VALUES (?, ?, 0, 0, x'')",
                    params![id, name],
                )
                .unwrap();
            for (ord, field) in fields.iter().enumerate() {
                self.conn
                    .execute(
                        "INSERT INTO fields (ntid, ord, name, config) VALUES (?, ?, ?, x'')",
                        params![id, ord as i64, field],
                    )
                    .unwrap();
            }
            for (ord, template) in templates.iter().enumerate() {
                self.conn
                    .execute(
                        "INSERT INTO templates (ntid, ord, name, mtime_secs, usn, config)
                         VALUES (?, ?, ?, 0, 0, x'')",
                        params![id, ord as i64, template],
                    )
                    .unwrap();
            }
        } else {
            let flds: Vec<_> = fields
                .iter()
                .enumerate()
                .map(|(ord, name)| serde_json::json!({ "name": name, "ord": ord }))
                .collect();
            let tmpls: Vec<_> = templates
                .iter()
                .enumerate()
                .map(|(ord, name)| {
                    serde_json::json!({ "name": name, "ord": ord, "qfmt": "", "afmt": "" })
                })
                .collect();
            self.models.insert(
                id.to_string(),
                serde_json::json!({ "id": id, "name": name, "type": 0, "flds": flds, "tmpls": tmpls }),
            );
        }
        self
    }

    /// The two Domino note types: source with one template, target with
    /// "Recall" at ordinal 1.
    pub fn domino(self) -> Self {
        self.note_type(SOURCE_MID, SOURCE_TYPE, &["Hanzi", "Meaning"], &["Recall"])
            .domino_target()
    }

    /// The Domino target note type alone.
    pub fn domino_target(self) -> Self {
        self.note_type(
            TARGET_MID,
            TARGET_TYPE,
            &["Hanzi", "Pinyin"],
            &["Stroke Order", "Recall"],
        )
    }

    pub fn build(self) -> SqliteStore {
        if !self.split {
            let json = serde_json::Value::Object(self.models).to_string();
            self.conn
                .execute("UPDATE col SET models = ?", [json])
                .unwrap();
        }
        SqliteStore::from_connection(self.conn).unwrap()
    }
}

pub fn add_note(store: &SqliteStore, id: i64, mid: i64, fields: &[&str]) {
    store
        .connection()
        .execute(
            "INSERT INTO notes (id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data)
             VALUES (?, ?, ?, 100, 0, '', ?, ?, 0, 0, '')",
            params![id, format!("g{}", id), mid, fields.join("\x1f"), fields[0]],
        )
        .unwrap();
}

/// Add a new (never studied) card.
pub fn add_card(store: &SqliteStore, id: i64, nid: i64, ord: u32, due: i64) {
    store
        .connection()
        .execute(
            "INSERT INTO cards (id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, left, odue, odid, flags, data)
             VALUES (?, ?, 1, ?, 100, 0, 0, 0, ?, 0, 0, 0, 0, 0, 0, 0, 0, '')",
            params![id, nid, ord, due],
        )
        .unwrap();
}

/// Add a card in review with some history.
pub fn add_review_card(store: &SqliteStore, id: i64, nid: i64, ord: u32, due: i64, ivl: i64) {
    store
        .connection()
        .execute(
            "INSERT INTO cards (id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, left, odue, odid, flags, data)
             VALUES (?, ?, 5, ?, 200, 3, 2, 2, ?, ?, 2300, 7, 1, 0, 0, 0, 3, '')",
            params![id, nid, ord, due, ivl],
        )
        .unwrap();
}

pub fn add_review(store: &SqliteStore, id: i64, cid: i64) {
    store
        .connection()
        .execute(
            "INSERT INTO revlog (id, cid, usn, ease, ivl, lastIvl, factor, time, type)
             VALUES (?, ?, 0, 3, 1, 0, 2500, 5000, 0)",
            params![id, cid],
        )
        .unwrap();
}

/// The Domino example: 日 and 木 on the source side, 日 and 火 on the target
/// side.
///
/// | card | note | value | template      | due |
/// |------|------|-------|---------------|-----|
/// | 1101 | 101  | 日    | source Recall | 5   |
/// | 1102 | 102  | 木    | source Recall | 10  |
/// | 2101 | 201  | 日    | target Recall | 3   |
/// | 2102 | 202  | 火    | target Recall | 7   |
/// | 2201 | 201  | 日    | Stroke Order  | 40  |
/// | 2202 | 202  | 火    | Stroke Order  | 41  |
pub fn domino_collection(builder: CollectionBuilder) -> SqliteStore {
    let store = builder.domino().build();

    add_note(&store, 101, SOURCE_MID, &["日", "sun"]);
    add_note(&store, 102, SOURCE_MID, &["木", "tree"]);
    add_review_card(&store, 1101, 101, 0, 5, 12);
    add_review_card(&store, 1102, 102, 0, 10, 30);

    add_note(&store, 201, TARGET_MID, &["日", "rì"]);
    add_note(&store, 202, TARGET_MID, &["火", "huǒ"]);
    add_card(&store, 2101, 201, 1, 3);
    add_card(&store, 2102, 202, 1, 7);
    add_card(&store, 2201, 201, 0, 40);
    add_card(&store, 2202, 202, 0, 41);

    store
}

pub fn card_ids(store: &SqliteStore) -> Vec<i64> {
    column(store, "SELECT id FROM cards ORDER BY id")
}

pub fn note_ids(store: &SqliteStore) -> Vec<i64> {
    column(store, "SELECT id FROM notes ORDER BY id")
}

pub fn revlog_card_ids(store: &SqliteStore) -> Vec<i64> {
    column(store, "SELECT cid FROM revlog ORDER BY id")
}

pub fn column(store: &SqliteStore, query: &str) -> Vec<i64> {
    store
        .connection()
        .prepare(query)
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}

pub fn col_mod(store: &SqliteStore) -> i64 {
    store
        .connection()
        .query_row("SELECT mod FROM col", [], |row| row.get(0))
        .unwrap()
}

/// Every column of every card and note, plus the collection mod.
pub fn snapshot(store: &SqliteStore) -> (Vec<String>, Vec<String>, i64) {
    let conn = store.connection();
    let cards = conn
        .prepare(
            "SELECT id || ':' || nid || ':' || ord || ':' || usn || ':' || type || ':' || queue || ':' || due || ':' || ivl
             FROM cards ORDER BY id",
        )
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    let notes = conn
        .prepare("SELECT id || ':' || usn || ':' || flds FROM notes ORDER BY id")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    (cards, notes, col_mod(store))
}
