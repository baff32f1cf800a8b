//! Read-only views of a collection's templates and cards.

use serde::Serialize;

use crate::error::Result;
use crate::query::CardQuery;
use crate::resolve::Catalog;
use crate::store::Store;
use crate::types::{CardId, NoteTypeId};

/// One template of one note type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateListing {
    /// Note type ID.
    pub note_type_id: NoteTypeId,
    /// Note type name.
    pub note_type: String,
    /// Template name.
    pub template: String,
    /// 0-based ordinal.
    pub ord: u32,
}

/// A card and the template it was rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardListing {
    /// Card ID.
    pub card_id: CardId,
    /// Template ordinal.
    pub ord: u32,
    /// Template name, `None` if the note type has no template at that ordinal.
    pub template: Option<String>,
    /// Current due value.
    pub due: i64,
}

/// Inspection workflow engine.
#[derive(Debug)]
pub struct InspectEngine<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> InspectEngine<'a, S> {
    /// Create an engine over a store handle.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Every template of every note type, ordered by note type ID then ordinal.
    pub fn templates(&self) -> Result<Vec<TemplateListing>> {
        let catalog = Catalog::load(self.store)?;
        Ok(catalog
            .note_types()
            .iter()
            .flat_map(|nt| {
                nt.templates.iter().map(move |t| TemplateListing {
                    note_type_id: nt.id,
                    note_type: nt.name.clone(),
                    template: t.name.clone(),
                    ord: t.ord,
                })
            })
            .collect())
    }

    /// The cards of every note type named `note_type`, with template names.
    pub fn cards(&self, note_type: &str) -> Result<Vec<CardListing>> {
        let catalog = Catalog::load(self.store)?;
        let mut listings = Vec::new();

        for nt in catalog.note_types().iter().filter(|nt| nt.name == note_type) {
            for card_id in self.store.find_card_ids(&CardQuery::new().note_type_id(nt.id))? {
                let card = self.store.card(card_id)?;
                listings.push(CardListing {
                    card_id,
                    ord: card.ord,
                    template: nt.template_by_ord(card.ord).map(|t| t.name.clone()),
                    due: card.scheduling.due,
                });
            }
        }

        Ok(listings)
    }

    /// Due value of a card.
    pub fn card_due(&self, card_id: CardId) -> Result<i64> {
        Ok(self.store.card(card_id)?.scheduling.due)
    }
}
