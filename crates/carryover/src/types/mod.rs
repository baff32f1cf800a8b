//! Typed records for the parts of a collection this crate touches.

mod card;
mod model;
mod note;

pub use card::{Card, CardType, Queue, SchedulingState, Usn};
pub use model::{FieldDef, NoteType, Template, TemplateRef};
pub use note::{FIELD_SEPARATOR, Note};

/// Card identifier (also the card's creation time in epoch milliseconds).
pub type CardId = i64;

/// Note identifier.
pub type NoteId = i64;

/// Note type (model) identifier.
pub type NoteTypeId = i64;
