//! Marking the collection as changed.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::Result;
use crate::store::Store;

/// Advance the collection modification time and commit pending changes.
///
/// The new time is the current epoch time in milliseconds, or one past the
/// stored value if the clock is behind it, so it always moves forward.
/// Returns the time written.
pub fn mark_dirty_and_commit<S: Store + ?Sized>(store: &mut S) -> Result<i64> {
    let previous = store.collection_modified()?;
    let stamp = epoch_millis().max(previous.saturating_add(1));
    store.set_collection_modified(stamp)?;
    store.save()?;
    debug!(previous, stamp, "collection marked modified");
    Ok(stamp)
}

/// Current Unix time in milliseconds.
fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_millis_has_thirteen_digits() {
        assert_eq!(epoch_millis().to_string().len(), 13);
    }
}
