//! Notes and their field values.

use serde::Serialize;

use super::{NoteId, NoteTypeId, Usn};

/// Separator between field values in the `flds` column.
pub const FIELD_SEPARATOR: char = '\x1f';

/// A note and its field values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    /// Note ID.
    pub id: NoteId,
    /// Note type the note belongs to.
    pub note_type_id: NoteTypeId,
    /// Field values in field ordinal order.
    pub fields: Vec<String>,
    /// Sync marker.
    pub usn: Usn,
    /// Last modification, epoch seconds.
    pub modified: i64,
}

impl Note {
    /// Split a stored `flds` value into field values.
    pub fn split_fields(flds: &str) -> Vec<String> {
        flds.split(FIELD_SEPARATOR).map(str::to_string).collect()
    }

    /// Value of the field at `index`.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }
}
