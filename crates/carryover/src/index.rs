//! Indexing target cards by a field value.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::query::CardQuery;
use crate::store::Store;
use crate::types::{CardId, NoteType, TemplateRef};

/// Which card keeps an index entry when several share a field value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The card enumerated last wins.
    #[default]
    LastSeen,
    /// The card enumerated first wins.
    FirstSeen,
    /// Fail with [`Error::DuplicateFieldValue`].
    Reject,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "last_seen" | "last" => Ok(DuplicatePolicy::LastSeen),
            "first_seen" | "first" => Ok(DuplicatePolicy::FirstSeen),
            "reject" => Ok(DuplicatePolicy::Reject),
            _ => Err(format!(
                "Invalid duplicate policy: {}. Use 'last-seen', 'first-seen' or 'reject'",
                s
            )),
        }
    }
}

/// Field value to card mapping for one template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardIndex {
    entries: HashMap<String, CardId>,
    shadowed: Vec<CardId>,
}

impl CardIndex {
    /// The card indexed under `value`.
    pub fn get(&self, value: &str) -> Option<CardId> {
        self.entries.get(value).copied()
    }

    /// Remove and return the card indexed under `value`.
    pub fn take(&mut self, value: &str) -> Option<CardId> {
        self.entries.remove(value)
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cards that lost their entry to another card with the same value.
    ///
    /// They cannot be matched by a transfer using this index.
    pub fn shadowed(&self) -> &[CardId] {
        &self.shadowed
    }

    /// Iterate over `(value, card)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, CardId)> {
        self.entries.iter().map(|(v, id)| (v.as_str(), *id))
    }
}

/// Index the cards of `template` by the value of `field`.
///
/// `note_type` must be the note type `template` belongs to. Read-only.
pub fn build_index<S: Store + ?Sized>(
    store: &S,
    note_type: &NoteType,
    template: TemplateRef,
    field: &str,
    policy: DuplicatePolicy,
) -> Result<CardIndex> {
    let field_index = field_position(note_type, field)?;
    let card_ids = store.find_card_ids(&CardQuery::for_template(template))?;
    debug!(template = %template, field, cards = card_ids.len(), "building card index");

    let mut index = CardIndex::default();
    for card_id in card_ids {
        let card = store.card(card_id)?;
        let note = store.note(card.note_id)?;
        let value = note.field(field_index).ok_or_else(|| {
            Error::InvalidRecord(format!(
                "note {} has no value for field '{}'",
                note.id, field
            ))
        })?;

        match index.entries.entry(value.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(card_id);
            }
            Entry::Occupied(mut slot) => {
                let earlier = *slot.get();
                match policy {
                    DuplicatePolicy::LastSeen => {
                        slot.insert(card_id);
                        index.shadowed.push(earlier);
                    }
                    DuplicatePolicy::FirstSeen => index.shadowed.push(card_id),
                    DuplicatePolicy::Reject => {
                        return Err(Error::DuplicateFieldValue {
                            field: field.to_string(),
                            value: value.to_string(),
                            first: earlier,
                            second: card_id,
                        });
                    }
                }
                warn!(field, value, earlier, later = card_id, ?policy, "duplicate field value");
            }
        }
    }

    Ok(index)
}

/// Position of `field` in notes of `note_type`.
pub(crate) fn field_position(note_type: &NoteType, field: &str) -> Result<usize> {
    note_type
        .field_map()
        .get(field)
        .map(|(i, _)| *i)
        .ok_or_else(|| Error::FieldNotFound {
            note_type: note_type.name.clone(),
            field: field.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_policy_from_str() {
        assert_eq!(
            "last-seen".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::LastSeen
        );
        assert_eq!(
            "first_seen".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::FirstSeen
        );
        assert_eq!(
            "Reject".parse::<DuplicatePolicy>().unwrap(),
            DuplicatePolicy::Reject
        );
        assert!("newest".parse::<DuplicatePolicy>().is_err());
    }

    #[test]
    fn test_take_is_exactly_once() {
        let mut index = CardIndex::default();
        index.entries.insert("日".to_string(), 3);
        assert_eq!(index.get("日"), Some(3));
        assert_eq!(index.take("日"), Some(3));
        assert_eq!(index.take("日"), None);
        assert!(index.is_empty());
    }
}
