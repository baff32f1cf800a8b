//! Template resolution.
//!
//! Maps a `(note type name, template name)` pair to the stable
//! [`TemplateRef`] of note type ID plus ordinal.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{NoteType, NoteTypeId, Template, TemplateRef};

/// What to do when several note types share a name and define the template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateMatch {
    /// Take the note type with the lowest ID.
    #[default]
    First,
    /// Fail with [`Error::AmbiguousTemplate`].
    Unique,
}

impl std::str::FromStr for TemplateMatch {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(TemplateMatch::First),
            "unique" => Ok(TemplateMatch::Unique),
            _ => Err(format!("Invalid template match: {}. Use 'first' or 'unique'", s)),
        }
    }
}

/// Names of a note type and one of its templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Note type name.
    pub note_type: String,
    /// Template name.
    pub template: String,
}

impl TemplateSpec {
    /// Create a template spec.
    pub fn new(note_type: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            note_type: note_type.into(),
            template: template.into(),
        }
    }
}

impl std::fmt::Display for TemplateSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.note_type, self.template)
    }
}

/// A resolved template and the note type that owns it.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    /// Owning note type.
    pub note_type: &'a NoteType,
    /// The template.
    pub template: &'a Template,
}

impl Resolved<'_> {
    /// Stable identity of the resolved template.
    pub fn template_ref(&self) -> TemplateRef {
        TemplateRef::new(self.note_type.id, self.template.ord)
    }
}

/// Snapshot of a collection's note types.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    note_types: Vec<NoteType>,
}

impl Catalog {
    /// Build a catalog from note types, keeping them ordered by ID.
    pub fn new(mut note_types: Vec<NoteType>) -> Self {
        note_types.sort_by_key(|nt| nt.id);
        Self { note_types }
    }

    /// Read the note types of a store.
    pub fn load<S: Store + ?Sized>(store: &S) -> Result<Self> {
        Ok(Self::new(store.note_types()?))
    }

    /// All note types.
    pub fn note_types(&self) -> &[NoteType] {
        &self.note_types
    }

    /// Look up a note type by ID.
    pub fn note_type(&self, id: NoteTypeId) -> Result<&NoteType> {
        self.note_types
            .iter()
            .find(|nt| nt.id == id)
            .ok_or(Error::NoteTypeNotFound(id))
    }

    /// Resolve a note type name and template name.
    ///
    /// # Example
    ///
    /// ```
    /// use carryover::resolve::{Catalog, TemplateMatch, TemplateSpec};
    /// use carryover::{NoteType, Template};
    ///
    /// let catalog = Catalog::new(vec![NoteType {
    ///     id: 7,
    ///     name: "Hanzi".to_string(),
    ///     fields: vec![],
    ///     templates: vec![Template { name: "Recall".to_string(), ord: 1 }],
    /// }]);
    ///
    /// let resolved = catalog
    ///     .resolve(&TemplateSpec::new("Hanzi", "Recall"), TemplateMatch::First)
    ///     .unwrap();
    /// assert_eq!(resolved.template_ref().note_type_id, 7);
    /// assert_eq!(resolved.template_ref().ord, 1);
    /// ```
    pub fn resolve(&self, spec: &TemplateSpec, policy: TemplateMatch) -> Result<Resolved<'_>> {
        let mut candidates = self
            .note_types
            .iter()
            .filter(|nt| nt.name == spec.note_type)
            .filter_map(|nt| {
                nt.template(&spec.template)
                    .map(|template| Resolved { note_type: nt, template })
            });

        let first = candidates.next().ok_or_else(|| Error::TemplateNotFound {
            note_type: spec.note_type.clone(),
            template: spec.template.clone(),
        })?;

        if policy == TemplateMatch::Unique {
            let others = candidates.count();
            if others > 0 {
                return Err(Error::AmbiguousTemplate {
                    note_type: spec.note_type.clone(),
                    template: spec.template.clone(),
                    count: others + 1,
                });
            }
        }

        Ok(first)
    }
}
