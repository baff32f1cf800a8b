//! [`Store`] implementation over an Anki collection file.
//!
//! Works on schema 11 collections (note types as JSON in `col.models`) and on
//! schema 15+ collections (`notetypes`, `fields` and `templates` tables). The
//! layout is detected when the store is opened.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params, params_from_iter};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::query::{CardQuery, NoteTypeFilter};
use crate::sql;
use crate::store::Store;
use crate::types::{
    Card, CardId, CardType, FieldDef, Note, NoteId, NoteType, Queue, SchedulingState, Template,
    Usn,
};

/// Where a collection keeps its note types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Schema 11: JSON in `col.models`.
    Legacy,
    /// Schema 15+: `notetypes`, `fields` and `templates` tables.
    Split,
}

/// A collection store backed by SQLite.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    layout: Layout,
}

impl SqliteStore {
    /// Open an existing collection file.
    ///
    /// The file is not created if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        Self::from_connection(conn)
    }

    /// Wrap an open connection.
    ///
    /// Fails with [`Error::InvalidRecord`] when the database has no `col`
    /// table.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        if !has_table(&conn, "col")? {
            return Err(Error::InvalidRecord(
                "database has no col table; not an Anki collection".to_string(),
            ));
        }
        let layout = if has_table(&conn, "notetypes")? {
            Layout::Split
        } else {
            Layout::Legacy
        };
        debug!(?layout, "opened collection");
        Ok(Self { conn, layout })
    }

    /// The detected note type layout.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Give back the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn legacy_note_types(&self) -> Result<Vec<NoteType>> {
        let json: String = self
            .conn
            .query_row(sql::SELECT_MODELS_JSON, [], |row| row.get(0))?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        let models: HashMap<String, LegacyNoteType> = serde_json::from_str(&json)?;
        let mut note_types: Vec<NoteType> = models.into_values().map(NoteType::from).collect();
        note_types.sort_by_key(|nt| nt.id);
        Ok(note_types)
    }

    fn split_note_types(&self) -> Result<Vec<NoteType>> {
        let mut stmt = self.conn.prepare(sql::SELECT_NOTETYPES)?;
        let heads = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut fields_stmt = self.conn.prepare(sql::SELECT_FIELDS)?;
        let mut templates_stmt = self.conn.prepare(sql::SELECT_TEMPLATES)?;

        let mut note_types = Vec::with_capacity(heads.len());
        for (id, name) in heads {
            let fields = fields_stmt
                .query_map([id], |row| {
                    Ok(FieldDef {
                        ord: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let templates = templates_stmt
                .query_map([id], |row| {
                    Ok(Template {
                        ord: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            note_types.push(NoteType {
                id,
                name,
                fields,
                templates,
            });
        }
        Ok(note_types)
    }
}

impl Store for SqliteStore {
    fn note_types(&self) -> Result<Vec<NoteType>> {
        match self.layout {
            Layout::Legacy => self.legacy_note_types(),
            Layout::Split => self.split_note_types(),
        }
    }

    fn find_card_ids(&self, query: &CardQuery) -> Result<Vec<CardId>> {
        let mut clauses = Vec::new();
        let mut args: Vec<i64> = Vec::new();

        match query.note_type_filter() {
            Some(NoteTypeFilter::Id(id)) => {
                clauses.push("n.mid = ?".to_string());
                args.push(*id);
            }
            Some(NoteTypeFilter::Name(name)) => {
                let ids: Vec<i64> = self
                    .note_types()?
                    .into_iter()
                    .filter(|nt| &nt.name == name)
                    .map(|nt| nt.id)
                    .collect();
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                clauses.push(format!("n.mid IN ({})", vec!["?"; ids.len()].join(", ")));
                args.extend(ids);
            }
            None => {}
        }

        if query.card_number().is_some() {
            // card:0 cannot match any template
            let Some(ord) = query.template_ord() else {
                return Ok(Vec::new());
            };
            clauses.push("c.ord = ?".to_string());
            args.push(i64::from(ord));
        }

        let mut statement = String::from("SELECT c.id FROM cards c JOIN notes n ON n.id = c.nid");
        if !clauses.is_empty() {
            statement.push_str(" WHERE ");
            statement.push_str(&clauses.join(" AND "));
        }
        statement.push_str(" ORDER BY c.id");

        debug!(query = %query, "finding cards");
        let mut stmt = self.conn.prepare(&statement)?;
        let ids = stmt
            .query_map(params_from_iter(args.iter()), |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<CardId>>>()?;
        Ok(ids)
    }

    fn card(&self, id: CardId) -> Result<Card> {
        let row = self
            .conn
            .query_row(sql::SELECT_CARD, [id], card_row)
            .optional()?
            .ok_or(Error::CardNotFound(id))?;
        Card::try_from(row)
    }

    fn note(&self, id: NoteId) -> Result<Note> {
        self.conn
            .query_row(sql::SELECT_NOTE, [id], |row| {
                Ok(Note {
                    id: row.get(0)?,
                    note_type_id: row.get(1)?,
                    modified: row.get(2)?,
                    usn: Usn(row.get(3)?),
                    fields: Note::split_fields(&row.get::<_, String>(4)?),
                })
            })
            .optional()?
            .ok_or(Error::NoteNotFound(id))
    }

    fn cards_of_note(&self, note_id: NoteId) -> Result<Vec<CardId>> {
        let mut stmt = self.conn.prepare(sql::SELECT_CARDS_OF_NOTE)?;
        let ids = stmt
            .query_map([note_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<CardId>>>()?;
        Ok(ids)
    }

    fn update_card(&mut self, card: &Card) -> Result<()> {
        let s = &card.scheduling;
        let changed = self
            .conn
            .execute(
                sql::UPDATE_CARD,
                params![
                    card.note_id,
                    card.deck_id,
                    card.ord,
                    s.modified,
                    card.usn.0,
                    s.card_type.as_raw(),
                    s.queue.as_raw(),
                    s.due,
                    s.interval,
                    s.ease_factor,
                    s.reps,
                    s.lapses,
                    s.left,
                    s.original_due,
                    card.original_deck_id,
                    s.flags,
                    card.data,
                    card.id
                ],
            )
            .map_err(|e| Error::write("update_card", e))?;
        if changed == 0 {
            return Err(Error::CardNotFound(card.id));
        }
        Ok(())
    }

    fn delete_card(&mut self, id: CardId) -> Result<()> {
        let changed = self
            .conn
            .execute(sql::DELETE_CARD, [id])
            .map_err(|e| Error::write("delete_card", e))?;
        if changed == 0 {
            return Err(Error::CardNotFound(id));
        }
        Ok(())
    }

    fn delete_note(&mut self, id: NoteId) -> Result<()> {
        let changed = self
            .conn
            .execute(sql::DELETE_NOTE, [id])
            .map_err(|e| Error::write("delete_note", e))?;
        if changed == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    fn reassign_card_id(&mut self, from: CardId, to: CardId) -> Result<()> {
        let changed = self
            .conn
            .execute(sql::REASSIGN_CARD_ID, [to, from])
            .map_err(|e| Error::write("reassign_card_id", e))?;
        if changed == 0 {
            return Err(Error::CardNotFound(from));
        }
        Ok(())
    }

    fn mark_note_unsynced(&mut self, id: NoteId) -> Result<()> {
        let changed = self
            .conn
            .execute(sql::SET_NOTE_USN, params![Usn::PENDING.0, id])
            .map_err(|e| Error::write("mark_note_unsynced", e))?;
        if changed == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    fn delete_review_log(&mut self, card_id: CardId) -> Result<usize> {
        self.conn
            .execute(sql::DELETE_REVLOG, [card_id])
            .map_err(|e| Error::write("delete_review_log", e))
    }

    fn collection_modified(&self) -> Result<i64> {
        Ok(self.conn.query_row(sql::SELECT_COL_MOD, [], |row| row.get(0))?)
    }

    fn set_collection_modified(&mut self, millis: i64) -> Result<()> {
        self.conn
            .execute(sql::UPDATE_COL_MOD, [millis])
            .map_err(|e| Error::write("set_collection_modified", e))?;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn
                .execute_batch("BEGIN IMMEDIATE")
                .map_err(|e| Error::write("begin", e))?;
        }
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("COMMIT")
                .map_err(|e| Error::CommitFailed(Box::new(e)))?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(|e| Error::write("rollback", e))?;
        }
        Ok(())
    }
}

fn has_table(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(sql::HAS_TABLE, [name], |row| row.get(0))?;
    Ok(count > 0)
}

/// Raw `cards` row before enum validation.
struct CardRow {
    id: i64,
    nid: i64,
    did: i64,
    ord: i64,
    modified: i64,
    usn: i32,
    card_type: i64,
    queue: i64,
    due: i64,
    ivl: i64,
    factor: i64,
    reps: i64,
    lapses: i64,
    left: i64,
    odue: i64,
    odid: i64,
    flags: i64,
    data: String,
}

fn card_row(row: &Row<'_>) -> rusqlite::Result<CardRow> {
    Ok(CardRow {
        id: row.get(0)?,
        nid: row.get(1)?,
        did: row.get(2)?,
        ord: row.get(3)?,
        modified: row.get(4)?,
        usn: row.get(5)?,
        card_type: row.get(6)?,
        queue: row.get(7)?,
        due: row.get(8)?,
        ivl: row.get(9)?,
        factor: row.get(10)?,
        reps: row.get(11)?,
        lapses: row.get(12)?,
        left: row.get(13)?,
        odue: row.get(14)?,
        odid: row.get(15)?,
        flags: row.get(16)?,
        data: row.get(17)?,
    })
}

impl TryFrom<CardRow> for Card {
    type Error = Error;

    fn try_from(row: CardRow) -> Result<Self> {
        let ord = u32::try_from(row.ord)
            .map_err(|_| Error::InvalidRecord(format!("card {} has ordinal {}", row.id, row.ord)))?;
        Ok(Card {
            id: row.id,
            note_id: row.nid,
            deck_id: row.did,
            ord,
            usn: Usn(row.usn),
            scheduling: SchedulingState {
                card_type: CardType::try_from(row.card_type)?,
                queue: Queue::try_from(row.queue)?,
                due: row.due,
                interval: row.ivl,
                ease_factor: row.factor,
                reps: row.reps,
                lapses: row.lapses,
                left: row.left,
                original_due: row.odue,
                flags: row.flags,
                modified: row.modified,
            },
            original_deck_id: row.odid,
            data: row.data,
        })
    }
}

/// Note type as stored in the schema 11 `col.models` JSON.
#[derive(Debug, Deserialize)]
struct LegacyNoteType {
    id: i64,
    name: String,
    #[serde(default)]
    flds: Vec<LegacyOrdinal>,
    #[serde(default)]
    tmpls: Vec<LegacyOrdinal>,
}

/// Field or template entry of a legacy note type.
#[derive(Debug, Deserialize)]
struct LegacyOrdinal {
    name: String,
    #[serde(default)]
    ord: Option<u32>,
}

impl From<LegacyNoteType> for NoteType {
    fn from(legacy: LegacyNoteType) -> Self {
        // Entries without an ord take their list position.
        let ordinal = |i: usize, ord: Option<u32>| ord.unwrap_or(i as u32);

        let mut fields: Vec<FieldDef> = legacy
            .flds
            .into_iter()
            .enumerate()
            .map(|(i, f)| FieldDef {
                ord: ordinal(i, f.ord),
                name: f.name,
            })
            .collect();
        fields.sort_by_key(|f| f.ord);

        let mut templates: Vec<Template> = legacy
            .tmpls
            .into_iter()
            .enumerate()
            .map(|(i, t)| Template {
                ord: ordinal(i, t.ord),
                name: t.name,
            })
            .collect();
        templates.sort_by_key(|t| t.ord);

        NoteType {
            id: legacy.id,
            name: legacy.name,
            fields,
            templates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_connection(models: &str) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(sql::SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags)
             VALUES (1, 0, 1000, 0, 11, 0, 0, 0, '{}', ?, '{}', '{}', '{}')",
            [models],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_rejects_non_collection() {
        let conn = Connection::open_in_memory().unwrap();
        let result = SqliteStore::from_connection(conn);
        assert!(matches!(result, Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn test_legacy_note_types_sorted_by_id() {
        let models = r#"{
            "20": {"id": 20, "name": "B", "flds": [{"name": "Back", "ord": 1}, {"name": "Front", "ord": 0}],
                   "tmpls": [{"name": "Card 1", "ord": 0}]},
            "10": {"id": 10, "name": "A", "flds": [{"name": "Word"}], "tmpls": [{"name": "Recall"}]}
        }"#;
        let store = SqliteStore::from_connection(legacy_connection(models)).unwrap();
        assert_eq!(store.layout(), Layout::Legacy);

        let note_types = store.note_types().unwrap();
        assert_eq!(note_types.len(), 2);
        assert_eq!(note_types[0].name, "A");
        assert_eq!(note_types[0].templates[0].ord, 0);
        assert_eq!(note_types[1].fields[0].name, "Front");
        assert_eq!(note_types[1].fields[1].name, "Back");
    }

    #[test]
    fn test_split_layout_detected() {
        let conn = legacy_connection("");
        conn.execute_batch(sql::NOTETYPE_TABLES).unwrap();
        conn.execute(
            "INSERT INTO notetypes (id, name, mtime_secs, usn, config) VALUES (5, 'Basic', 0, 0, x'')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO fields (ntid, ord, name, config) VALUES (5, 0, 'Front', x''), (5, 1, 'Back', x'')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO templates (ntid, ord, name, mtime_secs, usn, config) VALUES (5, 0, 'Card 1', 0, 0, x'')",
            [],
        )
        .unwrap();

        let store = SqliteStore::from_connection(conn).unwrap();
        assert_eq!(store.layout(), Layout::Split);

        let nt = store.note_type(5).unwrap();
        assert_eq!(nt.name, "Basic");
        assert_eq!(nt.field_index("Back"), Some(1));
        assert_eq!(nt.template("Card 1").unwrap().ord, 0);
        assert!(matches!(store.note_type(6), Err(Error::NoteTypeNotFound(6))));
    }

    #[test]
    fn test_empty_models_json() {
        let store = SqliteStore::from_connection(legacy_connection("")).unwrap();
        assert!(store.note_types().unwrap().is_empty());
    }

    #[test]
    fn test_transaction_rollback() {
        let mut store = SqliteStore::from_connection(legacy_connection("{}")).unwrap();
        store.begin().unwrap();
        store.set_collection_modified(5000).unwrap();
        store.rollback().unwrap();
        assert_eq!(store.collection_modified().unwrap(), 1000);

        store.begin().unwrap();
        store.set_collection_modified(6000).unwrap();
        store.save().unwrap();
        assert_eq!(store.collection_modified().unwrap(), 6000);
        assert!(store.connection().is_autocommit());
    }
}
