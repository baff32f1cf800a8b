//! Scheduling transfer between templates.
//!
//! For every card of a *source* template whose note has a field value that
//! also appears on a card of the *target* template, the target card takes
//! over the source card's scheduling state and then the source card's
//! identity: the source card and note are deleted and the target card is
//! renumbered to the source card's ID. The result is one card with the
//! target's content, the source's review progress and the source's ID.
//!
//! # Example
//!
//! ```no_run
//! use carryover::Engine;
//! use carryover::resolve::TemplateSpec;
//! use carryover::transfer::TransferJob;
//!
//! # fn example() -> carryover::Result<()> {
//! let mut engine = Engine::open("collection.anki2")?;
//!
//! let job = TransferJob::new(
//!     "Hanzi",
//!     TemplateSpec::new("Domino Text Input-43bf8", "Recall"),
//!     TemplateSpec::new("Domino Recognition and Stroke Order-6c462", "Recall"),
//! );
//!
//! let report = engine.transfer().run(&job)?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::index::{CardIndex, DuplicatePolicy, build_index, field_position};
use crate::query::CardQuery;
use crate::resolve::{Catalog, TemplateMatch, TemplateSpec};
use crate::store::Store;
use crate::sync::mark_dirty_and_commit;
use crate::types::{Card, CardId, Note, NoteId, NoteType, TemplateRef};

/// What happens to the review history of the target card's old ID.
///
/// After a merge the card carries the source card's ID, so the source card's
/// history stays attached to it. The target's own history refers to an ID
/// that no longer exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewLogPolicy {
    /// Leave the entries in place, pointing at the retired ID.
    Keep,
    /// Delete the entries of every retired card ID.
    #[default]
    Discard,
}

impl std::str::FromStr for ReviewLogPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keep" => Ok(ReviewLogPolicy::Keep),
            "discard" => Ok(ReviewLogPolicy::Discard),
            _ => Err(format!("Invalid review log policy: {}. Use 'keep' or 'discard'", s)),
        }
    }
}

/// What happens to a merged source note that still has other cards.
///
/// The other cards belong to templates of the source note type other than
/// the one being transferred. Deleting them discards their scheduling state,
/// so a later transfer from one of those templates finds nothing to carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingPolicy {
    /// Keep the note and its other cards; the note is deleted once its last
    /// card has been merged away.
    #[default]
    Keep,
    /// Delete the other cards together with the note.
    Delete,
}

impl std::str::FromStr for SiblingPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keep" => Ok(SiblingPolicy::Keep),
            "delete" => Ok(SiblingPolicy::Delete),
            _ => Err(format!("Invalid sibling policy: {}. Use 'keep' or 'delete'", s)),
        }
    }
}

/// Policies for a transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    /// Resolution of note type names shared by several note types.
    pub template_match: TemplateMatch,
    /// Which target card wins when several share a field value.
    pub duplicates: DuplicatePolicy,
    /// Handling of review history for retired card IDs.
    pub review_log: ReviewLogPolicy,
    /// Handling of the other cards of merged source notes.
    pub siblings: SiblingPolicy,
}

/// A transfer described by names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferJob {
    /// Field whose value pairs source and target cards.
    pub field: String,
    /// Template whose cards give their scheduling state.
    pub source: TemplateSpec,
    /// Template whose cards receive it.
    pub target: TemplateSpec,
    /// Policies.
    #[serde(flatten)]
    pub options: TransferOptions,
}

impl TransferJob {
    /// Create a job with default options.
    pub fn new(field: impl Into<String>, source: TemplateSpec, target: TemplateSpec) -> Self {
        Self {
            field: field.into(),
            source,
            target,
            options: TransferOptions::default(),
        }
    }

    /// Replace the job's options.
    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Check the job for empty names and identical templates.
    pub fn validate(&self) -> Result<()> {
        if self.field.trim().is_empty() {
            return Err(Error::Validation("field name is empty".to_string()));
        }
        for spec in [&self.source, &self.target] {
            if spec.note_type.is_empty() || spec.template.is_empty() {
                return Err(Error::Validation(format!("incomplete template '{}'", spec)));
            }
        }
        if self.source == self.target {
            return Err(Error::Validation(format!(
                "source and target are the same template '{}'",
                self.source
            )));
        }
        Ok(())
    }
}

/// One merged card pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Merge {
    /// Source card ID; the merged card now carries it.
    pub source_card_id: CardId,
    /// Target card ID before the merge; retired.
    pub target_card_id: CardId,
    /// Shared field value.
    pub value: String,
    /// Target due before the merge.
    pub due_before: i64,
    /// Due copied from the source.
    pub due_after: i64,
}

/// Outcome of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    /// Source template.
    pub source: TemplateRef,
    /// Target template.
    pub target: TemplateRef,
    /// Number of source cards merged into a target.
    pub matched: usize,
    /// Number of source cards left untouched.
    pub unmatched: usize,
    /// Merged pairs in processing order.
    pub merges: Vec<Merge>,
    /// Source cards left untouched.
    pub unmatched_card_ids: Vec<CardId>,
    /// Other cards of deleted source notes that were deleted with them.
    pub removed_sibling_cards: usize,
    /// Source notes kept because they still have other cards.
    pub kept_source_notes: usize,
    /// Review log entries deleted for retired card IDs.
    pub review_entries_removed: usize,
    /// Target cards unreachable because another card had the same value.
    pub shadowed_targets: Vec<CardId>,
    /// Collection modification time written on commit, if anything changed.
    pub committed_mod: Option<i64>,
}

impl TransferReport {
    fn new(source: TemplateRef, target: TemplateRef, index: &CardIndex) -> Self {
        Self {
            source,
            target,
            matched: 0,
            unmatched: 0,
            merges: Vec::new(),
            unmatched_card_ids: Vec::new(),
            removed_sibling_cards: 0,
            kept_source_notes: 0,
            review_entries_removed: 0,
            shadowed_targets: index.shadowed().to_vec(),
            committed_mod: None,
        }
    }

    fn skip(&mut self, card_id: CardId) {
        self.unmatched += 1;
        self.unmatched_card_ids.push(card_id);
    }

    /// Total number of source cards considered.
    pub fn total(&self) -> usize {
        self.matched + self.unmatched
    }
}

impl std::fmt::Display for TransferReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Transferred {} -> {}: matched {}, unmatched {}",
            self.source, self.target, self.matched, self.unmatched
        )?;
        for m in &self.merges {
            writeln!(
                f,
                "  card {} (due {}) -> card {} (was due {}), now card {} [{}]",
                m.source_card_id, m.due_after, m.target_card_id, m.due_before, m.source_card_id, m.value
            )?;
        }
        if self.removed_sibling_cards > 0 {
            writeln!(f, "  removed {} sibling cards of merged notes", self.removed_sibling_cards)?;
        }
        if self.kept_source_notes > 0 {
            writeln!(
                f,
                "  kept {} source notes that still have other cards",
                self.kept_source_notes
            )?;
        }
        if self.review_entries_removed > 0 {
            writeln!(f, "  removed {} review log entries", self.review_entries_removed)?;
        }
        if !self.shadowed_targets.is_empty() {
            writeln!(
                f,
                "  {} target cards shadowed by duplicate values: {:?}",
                self.shadowed_targets.len(),
                self.shadowed_targets
            )?;
        }
        Ok(())
    }
}

/// A pair a transfer would merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMerge {
    /// Source card ID.
    pub source_card_id: CardId,
    /// Target card ID.
    pub target_card_id: CardId,
    /// Shared field value.
    pub value: String,
}

/// What a transfer would do, computed without changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferPreview {
    /// Source template.
    pub source: TemplateRef,
    /// Target template.
    pub target: TemplateRef,
    /// Number of source cards.
    pub source_cards: usize,
    /// Number of distinct values in the target index.
    pub indexed_values: usize,
    /// Pairs that would be merged.
    pub planned: Vec<PlannedMerge>,
    /// Source cards that would be left untouched.
    pub unmatched_card_ids: Vec<CardId>,
    /// Other cards of merged source notes that would be deleted with them.
    pub removed_siblings: Vec<CardId>,
    /// Source notes that would be kept for their other cards.
    pub kept_source_notes: Vec<NoteId>,
    /// Target cards unreachable because of duplicate values.
    pub shadowed_targets: Vec<CardId>,
}

impl std::fmt::Display for TransferPreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Preview {} -> {}: {} source cards, {} indexed values, {} would match, {} unmatched",
            self.source,
            self.target,
            self.source_cards,
            self.indexed_values,
            self.planned.len(),
            self.unmatched_card_ids.len()
        )?;
        for p in &self.planned {
            writeln!(f, "  card {} -> card {} [{}]", p.source_card_id, p.target_card_id, p.value)?;
        }
        if !self.removed_siblings.is_empty() {
            writeln!(
                f,
                "  would delete {} sibling cards and their scheduling: {:?}",
                self.removed_siblings.len(),
                self.removed_siblings
            )?;
        }
        if !self.kept_source_notes.is_empty() {
            writeln!(
                f,
                "  would keep {} source notes for their other cards: {:?}",
                self.kept_source_notes.len(),
                self.kept_source_notes
            )?;
        }
        if !self.shadowed_targets.is_empty() {
            writeln!(f, "  shadowed target cards: {:?}", self.shadowed_targets)?;
        }
        Ok(())
    }
}

/// Validated inputs of a transfer.
struct Prepared {
    index: CardIndex,
    source_ids: Vec<CardId>,
    source_field: usize,
}

/// Scheduling transfer workflow engine.
#[derive(Debug)]
pub struct TransferEngine<'a, S: ?Sized> {
    store: &'a mut S,
}

impl<'a, S: Store + ?Sized> TransferEngine<'a, S> {
    /// Create an engine over a store handle.
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Resolve the job's templates and run the transfer.
    ///
    /// Fails with [`Error::TemplateNotFound`] before touching the store when
    /// either template does not resolve.
    pub fn run(&mut self, job: &TransferJob) -> Result<TransferReport> {
        job.validate()?;
        let catalog = Catalog::load(&*self.store)?;
        let (source, target) = resolve_pair(&catalog, job)?;
        info!(field = %job.field, source = %job.source, target = %job.target, "starting transfer");
        self.transfer_in(&catalog, &job.field, source, target, &job.options)
    }

    /// Transfer between two already resolved templates.
    ///
    /// The whole run happens in one store transaction: any failure rolls
    /// back every merge made so far. When nothing matches, nothing is
    /// written and nothing is committed.
    pub fn transfer(
        &mut self,
        field: &str,
        source: TemplateRef,
        target: TemplateRef,
        options: &TransferOptions,
    ) -> Result<TransferReport> {
        let catalog = Catalog::load(&*self.store)?;
        self.transfer_in(&catalog, field, source, target, options)
    }

    /// Compute what [`run`](Self::run) would do without changing anything.
    pub fn preview(&self, job: &TransferJob) -> Result<TransferPreview> {
        job.validate()?;
        let catalog = Catalog::load(&*self.store)?;
        let (source, target) = resolve_pair(&catalog, job)?;
        let Prepared {
            mut index,
            source_ids,
            source_field,
        } = prepare(&*self.store, &catalog, &job.field, source, target, &job.options)?;

        let mut preview = TransferPreview {
            source,
            target,
            source_cards: source_ids.len(),
            indexed_values: index.len(),
            planned: Vec::new(),
            unmatched_card_ids: Vec::new(),
            removed_siblings: Vec::new(),
            kept_source_notes: Vec::new(),
            shadowed_targets: index.shadowed().to_vec(),
        };

        for source_id in source_ids {
            let card = self.store.card(source_id)?;
            let note = self.store.note(card.note_id)?;
            let value = field_value(&note, source_field, &job.field)?;
            let Some(target_card_id) = index.take(value) else {
                preview.unmatched_card_ids.push(source_id);
                continue;
            };

            let target_note = self.store.card(target_card_id)?.note_id;
            if card.note_id != target_note {
                let siblings = siblings_of(&*self.store, &card)?;
                if !siblings.is_empty() {
                    match job.options.siblings {
                        SiblingPolicy::Keep => preview.kept_source_notes.push(card.note_id),
                        SiblingPolicy::Delete => preview.removed_siblings.extend(siblings),
                    }
                }
            }

            preview.planned.push(PlannedMerge {
                source_card_id: source_id,
                target_card_id,
                value: value.to_string(),
            });
        }

        Ok(preview)
    }

    fn transfer_in(
        &mut self,
        catalog: &Catalog,
        field: &str,
        source: TemplateRef,
        target: TemplateRef,
        options: &TransferOptions,
    ) -> Result<TransferReport> {
        let Prepared {
            mut index,
            source_ids,
            source_field,
        } = prepare(&*self.store, catalog, field, source, target, options)?;

        let mut report = TransferReport::new(source, target, &index);

        if index.is_empty() {
            info!(source_cards = source_ids.len(), "target index is empty, nothing to transfer");
            for id in source_ids {
                report.skip(id);
            }
            return Ok(report);
        }

        self.store.begin()?;
        let outcome = self
            .merge_all(&mut index, &source_ids, source_field, field, options, &mut report)
            .and_then(|()| {
                if report.matched > 0 {
                    mark_dirty_and_commit(&mut *self.store).map(Some)
                } else {
                    self.store.rollback().map(|()| None)
                }
            });

        match outcome {
            Ok(stamp) => {
                report.committed_mod = stamp;
                info!(matched = report.matched, unmatched = report.unmatched, "transfer finished");
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback) = self.store.rollback() {
                    warn!(error = %rollback, "rollback after failed transfer also failed");
                }
                Err(e)
            }
        }
    }

    fn merge_all(
        &mut self,
        index: &mut CardIndex,
        source_ids: &[CardId],
        source_field: usize,
        field: &str,
        options: &TransferOptions,
        report: &mut TransferReport,
    ) -> Result<()> {
        // Cards deleted along with a source note share its field value, whose
        // index entry is taken by that merge, so no later pair refers to them.
        for &source_id in source_ids {
            let source = self.store.card(source_id)?;
            let note = self.store.note(source.note_id)?;
            let value = field_value(&note, source_field, field)?;

            let Some(target_id) = index.take(value) else {
                debug!(card = source_id, value, "no target card with this value");
                report.skip(source_id);
                continue;
            };

            self.merge(&source, target_id, value, options, report)?;
        }

        Ok(())
    }

    fn merge(
        &mut self,
        source: &Card,
        target_id: CardId,
        value: &str,
        options: &TransferOptions,
        report: &mut TransferReport,
    ) -> Result<()> {
        let mut target = self.store.card(target_id)?;
        let due_before = target.scheduling.due;
        target.adopt_scheduling(source);
        self.store.update_card(&target)?;

        // Templates of one note type share notes; the note then stays.
        let siblings = if source.note_id != target.note_id {
            Some(siblings_of(&*self.store, source)?)
        } else {
            None
        };
        self.store.delete_card(source.id)?;

        if let Some(siblings) = siblings {
            match options.siblings {
                SiblingPolicy::Keep if !siblings.is_empty() => {
                    debug!(
                        note = source.note_id,
                        remaining = siblings.len(),
                        "source note kept for its other cards"
                    );
                    report.kept_source_notes += 1;
                }
                _ => {
                    for sibling in siblings {
                        self.store.delete_card(sibling)?;
                        report.removed_sibling_cards += 1;
                        if options.review_log == ReviewLogPolicy::Discard {
                            report.review_entries_removed +=
                                self.store.delete_review_log(sibling)?;
                        }
                    }
                    self.store.delete_note(source.note_id)?;
                }
            }
        }

        if options.review_log == ReviewLogPolicy::Discard {
            report.review_entries_removed += self.store.delete_review_log(target_id)?;
        }
        self.store.reassign_card_id(target_id, source.id)?;
        self.store.mark_note_unsynced(target.note_id)?;

        info!(
            source = source.id,
            target = target_id,
            value,
            due_before,
            due_after = source.scheduling.due,
            "merged card"
        );
        report.matched += 1;
        report.merges.push(Merge {
            source_card_id: source.id,
            target_card_id: target_id,
            value: value.to_string(),
            due_before,
            due_after: source.scheduling.due,
        });
        Ok(())
    }
}

/// Resolve both templates of a job before anything else happens.
fn resolve_pair(catalog: &Catalog, job: &TransferJob) -> Result<(TemplateRef, TemplateRef)> {
    let policy = job.options.template_match;
    let source = catalog.resolve(&job.source, policy);
    let target = catalog.resolve(&job.target, policy);
    match (source, target) {
        (Ok(source), Ok(target)) => Ok((source.template_ref(), target.template_ref())),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "could not resolve templates, nothing changed");
            Err(e)
        }
    }
}

/// Check preconditions, index the target template and list source cards.
fn prepare<S: Store + ?Sized>(
    store: &S,
    catalog: &Catalog,
    field: &str,
    source: TemplateRef,
    target: TemplateRef,
    options: &TransferOptions,
) -> Result<Prepared> {
    if source == target {
        return Err(Error::Validation(format!(
            "source and target are the same template {}",
            source
        )));
    }

    let source_type = template_owner(catalog, source)?;
    let target_type = template_owner(catalog, target)?;
    let source_field = field_position(source_type, field)?;
    field_position(target_type, field)?;

    let index = build_index(store, target_type, target, field, options.duplicates)?;
    let source_ids = store.find_card_ids(&CardQuery::for_template(source))?;
    debug!(
        source_cards = source_ids.len(),
        indexed_values = index.len(),
        "prepared transfer"
    );

    Ok(Prepared {
        index,
        source_ids,
        source_field,
    })
}

/// The note type of `template`, checking the template exists.
fn template_owner(catalog: &Catalog, template: TemplateRef) -> Result<&NoteType> {
    let note_type = catalog.note_type(template.note_type_id)?;
    if note_type.template_by_ord(template.ord).is_none() {
        return Err(Error::TemplateNotFound {
            note_type: note_type.name.clone(),
            template: format!("card {}", template.card_number()),
        });
    }
    Ok(note_type)
}

/// The other cards of `card`'s note.
fn siblings_of<S: Store + ?Sized>(store: &S, card: &Card) -> Result<Vec<CardId>> {
    Ok(store
        .cards_of_note(card.note_id)?
        .into_iter()
        .filter(|&id| id != card.id)
        .collect())
}

fn field_value<'n>(note: &'n Note, index: usize, field: &str) -> Result<&'n str> {
    note.field(index).ok_or_else(|| {
        Error::InvalidRecord(format!("note {} has no value for field '{}'", note.id, field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> TransferJob {
        TransferJob::new(
            "Hanzi",
            TemplateSpec::new("Domino Text Input-43bf8", "Recall"),
            TemplateSpec::new("Domino Recognition and Stroke Order-6c462", "Recall"),
        )
    }

    #[test]
    fn test_validate_accepts_job() {
        assert!(job().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_same_template() {
        let mut job = job();
        job.target = job.source.clone();
        assert!(matches!(job.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_empty_field() {
        let mut job = job();
        job.field = "  ".to_string();
        assert!(matches!(job.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_default_options() {
        let options = TransferOptions::default();
        assert_eq!(options.template_match, TemplateMatch::First);
        assert_eq!(options.duplicates, DuplicatePolicy::LastSeen);
        assert_eq!(options.review_log, ReviewLogPolicy::Discard);
        assert_eq!(options.siblings, SiblingPolicy::Keep);
    }

    #[test]
    fn test_sibling_policy_from_str() {
        assert_eq!("Delete".parse::<SiblingPolicy>().unwrap(), SiblingPolicy::Delete);
        assert!("drop".parse::<SiblingPolicy>().is_err());
    }

    #[test]
    fn test_preview_display_lists_removed_siblings() {
        let preview = TransferPreview {
            source: TemplateRef::new(1, 0),
            target: TemplateRef::new(2, 0),
            source_cards: 1,
            indexed_values: 1,
            planned: vec![PlannedMerge {
                source_card_id: 11,
                target_card_id: 21,
                value: "日".to_string(),
            }],
            unmatched_card_ids: Vec::new(),
            removed_siblings: vec![12],
            kept_source_notes: Vec::new(),
            shadowed_targets: Vec::new(),
        };

        let text = preview.to_string();
        assert!(text.contains("would delete 1 sibling cards and their scheduling: [12]"));
        assert!(!text.contains("would keep"));
    }

    #[test]
    fn test_review_log_policy_from_str() {
        assert_eq!("KEEP".parse::<ReviewLogPolicy>().unwrap(), ReviewLogPolicy::Keep);
        assert!("archive".parse::<ReviewLogPolicy>().is_err());
    }

    #[test]
    fn test_report_display_lists_pairs() {
        let mut report = TransferReport::new(
            TemplateRef::new(1, 0),
            TemplateRef::new(2, 0),
            &CardIndex::default(),
        );
        report.matched = 1;
        report.merges.push(Merge {
            source_card_id: 11,
            target_card_id: 21,
            value: "日".to_string(),
            due_before: 3,
            due_after: 5,
        });
        report.skip(12);

        let text = report.to_string();
        assert!(text.contains("matched 1, unmatched 1"));
        assert!(text.contains("card 11 (due 5) -> card 21 (was due 3)"));
        assert_eq!(report.total(), 2);
    }
}
