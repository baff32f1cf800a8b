//! Note type (model) types.

use serde::Serialize;
use std::collections::HashMap;

use super::NoteTypeId;

/// A note type with its fields and card templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteType {
    /// Note type ID.
    pub id: NoteTypeId,
    /// Note type name. Not guaranteed unique within a collection.
    pub name: String,
    /// Fields in ordinal order.
    pub fields: Vec<FieldDef>,
    /// Templates in ordinal order.
    pub templates: Vec<Template>,
}

impl NoteType {
    /// Map field names to their position and definition.
    pub fn field_map(&self) -> HashMap<&str, (usize, &FieldDef)> {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.as_str(), (i, f)))
            .collect()
    }

    /// Position of the named field in a note's field list.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Find a template by name.
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Find a template by ordinal.
    pub fn template_by_ord(&self, ord: u32) -> Option<&Template> {
        self.templates.iter().find(|t| t.ord == ord)
    }
}

/// Field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field ordinal.
    pub ord: u32,
}

/// Card template definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    /// Template name, unique within its note type only.
    pub name: String,
    /// 0-based ordinal.
    pub ord: u32,
}

/// Stable identity of a template: note type plus ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TemplateRef {
    /// Owning note type.
    pub note_type_id: NoteTypeId,
    /// 0-based template ordinal.
    pub ord: u32,
}

impl TemplateRef {
    /// Create a template reference.
    pub fn new(note_type_id: NoteTypeId, ord: u32) -> Self {
        Self { note_type_id, ord }
    }

    /// The 1-based card number used by Anki's `card:` search.
    pub fn card_number(&self) -> u32 {
        self.ord + 1
    }
}

impl std::fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.note_type_id, self.ord)
    }
}
