//! SQL for Anki collection files.
//!
//! [`SCHEMA`] is the schema 11 layout, where note types live as JSON in
//! `col.models`. Newer collections keep note types in the tables created by
//! [`NOTETYPE_TABLES`]. Both are used by tests to build fixture collections.

/// SQL to create the schema 11 tables.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS col (
    id              INTEGER PRIMARY KEY,
    crt             INTEGER NOT NULL,
    mod             INTEGER NOT NULL,
    scm             INTEGER NOT NULL,
    ver             INTEGER NOT NULL,
    dty             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    ls              INTEGER NOT NULL,
    conf            TEXT NOT NULL,
    models          TEXT NOT NULL,
    decks           TEXT NOT NULL,
    dconf           TEXT NOT NULL,
    tags            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notes (
    id              INTEGER PRIMARY KEY,
    guid            TEXT NOT NULL,
    mid             INTEGER NOT NULL,
    mod             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    tags            TEXT NOT NULL,
    flds            TEXT NOT NULL,
    sfld            INTEGER NOT NULL,
    csum            INTEGER NOT NULL,
    flags           INTEGER NOT NULL,
    data            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cards (
    id              INTEGER PRIMARY KEY,
    nid             INTEGER NOT NULL,
    did             INTEGER NOT NULL,
    ord             INTEGER NOT NULL,
    mod             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    type            INTEGER NOT NULL,
    queue           INTEGER NOT NULL,
    due             INTEGER NOT NULL,
    ivl             INTEGER NOT NULL,
    factor          INTEGER NOT NULL,
    reps            INTEGER NOT NULL,
    lapses          INTEGER NOT NULL,
    left            INTEGER NOT NULL,
    odue            INTEGER NOT NULL,
    odid            INTEGER NOT NULL,
    flags           INTEGER NOT NULL,
    data            TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS revlog (
    id              INTEGER PRIMARY KEY,
    cid             INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    ease            INTEGER NOT NULL,
    ivl             INTEGER NOT NULL,
    lastIvl         INTEGER NOT NULL,
    factor          INTEGER NOT NULL,
    time            INTEGER NOT NULL,
    type            INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS graves (
    usn             INTEGER NOT NULL,
    oid             INTEGER NOT NULL,
    type            INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS ix_notes_usn ON notes (usn);
CREATE INDEX IF NOT EXISTS ix_cards_usn ON cards (usn);
CREATE INDEX IF NOT EXISTS ix_revlog_usn ON revlog (usn);
CREATE INDEX IF NOT EXISTS ix_cards_nid ON cards (nid);
CREATE INDEX IF NOT EXISTS ix_cards_sched ON cards (did, queue, due);
CREATE INDEX IF NOT EXISTS ix_revlog_cid ON revlog (cid);
CREATE INDEX IF NOT EXISTS ix_notes_csum ON notes (csum);
"#;

/// SQL to create the note type tables of schema 15 and later.
pub const NOTETYPE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS notetypes (
    id              INTEGER NOT NULL PRIMARY KEY,
    name            TEXT NOT NULL,
    mtime_secs      INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    config          BLOB NOT NULL
);

CREATE TABLE IF NOT EXISTS fields (
    ntid            INTEGER NOT NULL,
    ord             INTEGER NOT NULL,
    name            TEXT NOT NULL,
    config          BLOB NOT NULL,
    PRIMARY KEY (ntid, ord)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS templates (
    ntid            INTEGER NOT NULL,
    ord             INTEGER NOT NULL,
    name            TEXT NOT NULL,
    mtime_secs      INTEGER NOT NULL,
    usn             INTEGER NOT NULL,
    config          BLOB NOT NULL,
    PRIMARY KEY (ntid, ord)
) WITHOUT ROWID;
"#;

pub(crate) const HAS_TABLE: &str =
    "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?";

pub(crate) const SELECT_MODELS_JSON: &str = "SELECT models FROM col LIMIT 1";

pub(crate) const SELECT_NOTETYPES: &str = "SELECT id, name FROM notetypes ORDER BY id";

pub(crate) const SELECT_FIELDS: &str = "SELECT ord, name FROM fields WHERE ntid = ? ORDER BY ord";

pub(crate) const SELECT_TEMPLATES: &str =
    "SELECT ord, name FROM templates WHERE ntid = ? ORDER BY ord";

pub(crate) const SELECT_CARD: &str = "SELECT id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, left, odue, odid, flags, data
     FROM cards WHERE id = ?";

pub(crate) const SELECT_NOTE: &str = "SELECT id, mid, mod, usn, flds FROM notes WHERE id = ?";

pub(crate) const SELECT_CARDS_OF_NOTE: &str = "SELECT id FROM cards WHERE nid = ? ORDER BY id";

pub(crate) const UPDATE_CARD: &str = "UPDATE cards SET nid = ?, did = ?, ord = ?, mod = ?, usn = ?, type = ?, queue = ?, due = ?, ivl = ?,
         factor = ?, reps = ?, lapses = ?, left = ?, odue = ?, odid = ?, flags = ?, data = ?
     WHERE id = ?";

pub(crate) const DELETE_CARD: &str = "DELETE FROM cards WHERE id = ?";

pub(crate) const DELETE_NOTE: &str = "DELETE FROM notes WHERE id = ?";

pub(crate) const REASSIGN_CARD_ID: &str = "UPDATE cards SET id = ?1 WHERE id = ?2";

pub(crate) const SET_NOTE_USN: &str = "UPDATE notes SET usn = ? WHERE id = ?";

pub(crate) const DELETE_REVLOG: &str = "DELETE FROM revlog WHERE cid = ?";

pub(crate) const SELECT_COL_MOD: &str = "SELECT mod FROM col LIMIT 1";

pub(crate) const UPDATE_COL_MOD: &str = "UPDATE col SET mod = ?";
