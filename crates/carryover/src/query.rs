//! Typed card queries.
//!
//! A [`CardQuery`] is what the indexer and the transfer engine hand to
//! [`Store::find_card_ids`](crate::Store::find_card_ids). Stores read the
//! typed filters directly; the [`Display`](std::fmt::Display) form renders
//! the same filters in Anki search syntax so they can be logged or pasted
//! into the browser.
//!
//! # Example
//!
//! ```
//! use carryover::CardQuery;
//!
//! let q = CardQuery::new().note_type("Domino Text Input-43bf8").card_template(1);
//! assert_eq!(q.to_string(), "\"note:Domino Text Input-43bf8\" card:1");
//!
//! let q = CardQuery::new().note_type_id(1342697561419).card_template(2);
//! assert_eq!(q.to_string(), "mid:1342697561419 card:2");
//! ```

use crate::types::{NoteTypeId, TemplateRef};

/// Note type filter of a [`CardQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteTypeFilter {
    /// Every note type carrying this name.
    Name(String),
    /// Exactly this note type.
    Id(NoteTypeId),
}

/// A query selecting cards by note type and template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "CardQuery does nothing until passed to a store"]
pub struct CardQuery {
    note_type: Option<NoteTypeFilter>,
    card: Option<u32>,
}

impl CardQuery {
    /// Create a query matching every card.
    pub fn new() -> Self {
        Self::default()
    }

    /// Query for the cards rendered from one template.
    pub fn for_template(template: TemplateRef) -> Self {
        Self::new()
            .note_type_id(template.note_type_id)
            .card_template(template.card_number())
    }

    /// Filter by note type name.
    pub fn note_type(mut self, name: &str) -> Self {
        self.note_type = Some(NoteTypeFilter::Name(name.to_string()));
        self
    }

    /// Filter by note type ID.
    pub fn note_type_id(mut self, id: NoteTypeId) -> Self {
        self.note_type = Some(NoteTypeFilter::Id(id));
        self
    }

    /// Filter by card template number (1-indexed, as in Anki's `card:`).
    pub fn card_template(mut self, number: u32) -> Self {
        self.card = Some(number);
        self
    }

    /// The note type filter, if any.
    pub fn note_type_filter(&self) -> Option<&NoteTypeFilter> {
        self.note_type.as_ref()
    }

    /// The 1-based card number filter, if any.
    pub fn card_number(&self) -> Option<u32> {
        self.card
    }

    /// The 0-based template ordinal filter, if any.
    ///
    /// A card number of 0 never matches anything and yields `None` here;
    /// stores treat it as an empty result.
    pub fn template_ord(&self) -> Option<u32> {
        self.card.and_then(|n| n.checked_sub(1))
    }
}

impl std::fmt::Display for CardQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        match &self.note_type {
            Some(NoteTypeFilter::Name(name)) => parts.push(quote_if_needed(&format!("note:{}", name))),
            Some(NoteTypeFilter::Id(id)) => parts.push(format!("mid:{}", id)),
            None => {}
        }
        if let Some(n) = self.card {
            parts.push(format!("card:{}", n));
        }
        write!(f, "{}", parts.join(" "))
    }
}

/// Quote a search term if it contains characters Anki treats specially.
fn quote_if_needed(s: &str) -> String {
    if s.contains(' ') || s.contains('"') || s.contains('(') || s.contains(')') {
        format!("\"{}\"", s.replace('"', "\\\""))
    } else {
        s.to_string()
    }
}
