//! Carry Anki scheduling state from one note template to another.
//!
//! When a note type is restructured (templates split, renamed or moved to a
//! new note type), the cards of the new template start from scratch. This
//! crate pairs each card of a *source* template with the card of a *target*
//! template whose note has the same value in a chosen field, copies the
//! source card's scheduling state onto the target card, and merges the pair
//! into one card that keeps the source card's ID. The collection is then
//! marked as changed so the next sync pushes the result.
//!
//! The pipeline runs in four steps, each in its own module:
//!
//! - [`resolve`]: note type and template names to a [`TemplateRef`]
//! - [`index`]: target cards keyed by field value
//! - [`transfer`]: matching, copying and identity reassignment
//! - [`sync`]: collection modification time and commit
//!
//! # Quick Start
//!
//! ```no_run
//! use carryover::Engine;
//! use carryover::resolve::TemplateSpec;
//! use carryover::transfer::TransferJob;
//!
//! # fn example() -> carryover::Result<()> {
//! let mut engine = Engine::open("collection.anki2")?;
//!
//! for t in engine.inspect().templates()? {
//!     println!("{} / {}", t.note_type, t.template);
//! }
//!
//! let job = TransferJob::new(
//!     "Hanzi",
//!     TemplateSpec::new("Domino Text Input-43bf8", "Recall"),
//!     TemplateSpec::new("Domino Recognition and Stroke Order-6c462", "Recall"),
//! );
//! let report = engine.transfer().run(&job)?;
//! println!("matched {}, unmatched {}", report.matched, report.unmatched);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `sqlite` (default): [`SqliteStore`], a [`Store`] over collection files

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod index;
pub mod inspect;
pub mod query;
pub mod resolve;
pub mod store;
pub mod sync;
pub mod transfer;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sql;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use config::JobFile;
pub use error::{Error, Result};
pub use query::CardQuery;
pub use store::Store;
pub use types::{
    Card, CardId, CardType, FieldDef, Note, NoteId, NoteType, NoteTypeId, Queue, SchedulingState,
    Template, TemplateRef, Usn,
};

#[cfg(feature = "sqlite")]
pub use sqlite::{Layout, SqliteStore};

use inspect::InspectEngine;
use transfer::TransferEngine;

/// Workflow engine over a collection store.
///
/// The engine owns the store handle and lends it to the workflow modules, so
/// every component works on the same explicitly passed collection.
#[derive(Debug)]
pub struct Engine<S> {
    store: S,
}

impl<S: Store> Engine<S> {
    /// Create an engine over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a mutable reference to the underlying store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give back the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Access transfer workflows.
    pub fn transfer(&mut self) -> TransferEngine<'_, S> {
        TransferEngine::new(&mut self.store)
    }

    /// Access read-only inspection.
    pub fn inspect(&self) -> InspectEngine<'_, S> {
        InspectEngine::new(&self.store)
    }
}

#[cfg(feature = "sqlite")]
impl Engine<SqliteStore> {
    /// Open a collection file.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(SqliteStore::open(path)?))
    }
}
