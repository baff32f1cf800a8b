//! Card and scheduling types.

use serde::Serialize;

use super::{CardId, NoteId};
use crate::error::{Error, Result};

/// Update sequence number of a record.
///
/// Records changed locally and not yet pushed to the sync server carry
/// [`Usn::PENDING`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Usn(pub i32);

impl Usn {
    /// Marker for "needs push".
    pub const PENDING: Usn = Usn(-1);

    /// Whether the record is waiting to be pushed.
    pub fn is_pending(self) -> bool {
        self == Self::PENDING
    }
}

/// Scheduling queue a card is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Queue {
    /// Buried by the user.
    UserBuried,
    /// Buried by the scheduler (sibling burying).
    SchedBuried,
    /// Suspended.
    Suspended,
    /// Not studied yet.
    New,
    /// Intraday learning; `due` is an epoch timestamp.
    Learn,
    /// Review; `due` is a day number.
    Review,
    /// Interday learning; `due` is a day number.
    DayLearn,
    /// Preview in a filtered deck.
    Preview,
}

impl Queue {
    /// Raw value stored in the `queue` column.
    pub fn as_raw(self) -> i64 {
        match self {
            Queue::UserBuried => -3,
            Queue::SchedBuried => -2,
            Queue::Suspended => -1,
            Queue::New => 0,
            Queue::Learn => 1,
            Queue::Review => 2,
            Queue::DayLearn => 3,
            Queue::Preview => 4,
        }
    }
}

impl TryFrom<i64> for Queue {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self> {
        Ok(match raw {
            -3 => Queue::UserBuried,
            -2 => Queue::SchedBuried,
            -1 => Queue::Suspended,
            0 => Queue::New,
            1 => Queue::Learn,
            2 => Queue::Review,
            3 => Queue::DayLearn,
            4 => Queue::Preview,
            other => return Err(Error::InvalidRecord(format!("unknown card queue {}", other))),
        })
    }
}

/// Card type (learning stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    /// Never studied.
    New,
    /// In initial learning.
    Learn,
    /// Graduated to review.
    Review,
    /// Relearning after a lapse.
    Relearn,
}

impl CardType {
    /// Raw value stored in the `type` column.
    pub fn as_raw(self) -> i64 {
        match self {
            CardType::New => 0,
            CardType::Learn => 1,
            CardType::Review => 2,
            CardType::Relearn => 3,
        }
    }
}

impl TryFrom<i64> for CardType {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self> {
        Ok(match raw {
            0 => CardType::New,
            1 => CardType::Learn,
            2 => CardType::Review,
            3 => CardType::Relearn,
            other => return Err(Error::InvalidRecord(format!("unknown card type {}", other))),
        })
    }
}

/// Everything that governs when a card is next shown.
///
/// This is the set copied from a source card onto its matched target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulingState {
    /// Learning stage.
    pub card_type: CardType,
    /// Queue.
    pub queue: Queue,
    /// Due position, day number or timestamp depending on the queue.
    pub due: i64,
    /// Interval in days (negative: seconds, for learning cards).
    pub interval: i64,
    /// Ease factor in permille (2500 = 250%).
    pub ease_factor: i64,
    /// Number of reviews.
    pub reps: i64,
    /// Number of lapses.
    pub lapses: i64,
    /// Remaining learning steps.
    pub left: i64,
    /// Due value before the card entered a filtered deck.
    pub original_due: i64,
    /// Card flags.
    pub flags: i64,
    /// Last modification, epoch seconds.
    pub modified: i64,
}

/// A card with its scheduling state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    /// Card ID.
    pub id: CardId,
    /// Owning note.
    pub note_id: NoteId,
    /// Deck the card lives in.
    pub deck_id: i64,
    /// Template ordinal.
    pub ord: u32,
    /// Sync marker.
    pub usn: Usn,
    /// Scheduling state.
    pub scheduling: SchedulingState,
    /// Home deck while in a filtered deck, otherwise 0.
    pub original_deck_id: i64,
    /// Opaque per-card data.
    pub data: String,
}

impl Card {
    /// Replace this card's scheduling state with `source`'s and mark the
    /// card as needing a push.
    ///
    /// Identity, note, deck, ordinal and data are left untouched.
    pub fn adopt_scheduling(&mut self, source: &Card) {
        self.scheduling = source.scheduling.clone();
        self.usn = Usn::PENDING;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: CardId, due: i64) -> Card {
        Card {
            id,
            note_id: id + 1,
            deck_id: 1,
            ord: 0,
            usn: Usn(42),
            scheduling: SchedulingState {
                card_type: CardType::New,
                queue: Queue::New,
                due,
                interval: 0,
                ease_factor: 0,
                reps: 0,
                lapses: 0,
                left: 0,
                original_due: 0,
                flags: 0,
                modified: 100,
            },
            original_deck_id: 0,
            data: String::new(),
        }
    }

    #[test]
    fn test_queue_raw_values() {
        for raw in -3..=4 {
            assert_eq!(Queue::try_from(raw).unwrap().as_raw(), raw);
        }
        assert!(matches!(Queue::try_from(7), Err(Error::InvalidRecord(_))));
    }

    #[test]
    fn test_card_type_raw_values() {
        for raw in 0..=3 {
            assert_eq!(CardType::try_from(raw).unwrap().as_raw(), raw);
        }
        assert!(CardType::try_from(-1).is_err());
    }

    #[test]
    fn test_adopt_scheduling() {
        let mut source = card(10, 5);
        source.scheduling.card_type = CardType::Review;
        source.scheduling.queue = Queue::Review;
        source.scheduling.interval = 12;
        source.scheduling.ease_factor = 2300;
        source.scheduling.lapses = 2;
        source.deck_id = 99;

        let mut target = card(20, 3);
        target.data = "{\"pos\":3}".to_string();
        target.adopt_scheduling(&source);

        assert_eq!(target.scheduling, source.scheduling);
        assert_eq!(target.id, 20);
        assert_eq!(target.note_id, 21);
        assert_eq!(target.deck_id, 1);
        assert_eq!(target.data, "{\"pos\":3}");
        assert!(target.usn.is_pending());
    }
}
