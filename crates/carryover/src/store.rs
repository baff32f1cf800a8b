//! The collection store interface.
//!
//! The transfer pipeline never owns collection storage. Everything it reads
//! or writes goes through a [`Store`] handle passed in by the caller, so the
//! same engine can run against a collection file ([`SqliteStore`]) or any
//! other backend that can honour these operations.
//!
//! [`SqliteStore`]: crate::SqliteStore

use crate::error::{Error, Result};
use crate::query::CardQuery;
use crate::types::{Card, CardId, Note, NoteId, NoteType, NoteTypeId};

/// Read and write access to a note/card collection.
///
/// All calls are blocking. Implementations must provide single-writer
/// semantics between [`begin`](Store::begin) and
/// [`save`](Store::save)/[`rollback`](Store::rollback).
pub trait Store {
    /// All note types with their fields and templates, ordered by ID.
    fn note_types(&self) -> Result<Vec<NoteType>>;

    /// Look up one note type.
    fn note_type(&self, id: NoteTypeId) -> Result<NoteType> {
        self.note_types()?
            .into_iter()
            .find(|nt| nt.id == id)
            .ok_or(Error::NoteTypeNotFound(id))
    }

    /// IDs of the cards matching `query`, in store enumeration order.
    fn find_card_ids(&self, query: &CardQuery) -> Result<Vec<CardId>>;

    /// Read a card.
    fn card(&self, id: CardId) -> Result<Card>;

    /// Read a note.
    fn note(&self, id: NoteId) -> Result<Note>;

    /// IDs of every card belonging to a note.
    fn cards_of_note(&self, note_id: NoteId) -> Result<Vec<CardId>>;

    /// Persist every column of `card` under `card.id`.
    fn update_card(&mut self, card: &Card) -> Result<()>;

    /// Delete a card row.
    fn delete_card(&mut self, id: CardId) -> Result<()>;

    /// Delete a note row. Cards are not touched.
    fn delete_note(&mut self, id: NoteId) -> Result<()>;

    /// Change a card's primary identifier from `from` to `to`.
    fn reassign_card_id(&mut self, from: CardId, to: CardId) -> Result<()>;

    /// Set a note's sync marker to "needs push".
    fn mark_note_unsynced(&mut self, id: NoteId) -> Result<()>;

    /// Delete the review history of a card, returning the number of entries
    /// removed.
    fn delete_review_log(&mut self, card_id: CardId) -> Result<usize>;

    /// Collection-level modification time, epoch milliseconds.
    fn collection_modified(&self) -> Result<i64>;

    /// Set the collection-level modification time.
    fn set_collection_modified(&mut self, millis: i64) -> Result<()>;

    /// Start a transaction. Calling it inside an open transaction is a no-op.
    fn begin(&mut self) -> Result<()>;

    /// Durably commit pending changes.
    fn save(&mut self) -> Result<()>;

    /// Discard pending changes.
    fn rollback(&mut self) -> Result<()>;
}
