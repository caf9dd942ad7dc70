use std::collections::{BTreeSet, HashMap};

use tracing::warn;

/// Single-byte payload codes that can address at most this many spots.
pub const MAX_SPOTS: usize = 256;

/// Bidirectional `spot id <-> byte code` table.
///
/// Codes are derived, not stored: ids are sorted ascending, duplicates
/// dropped, and codes `0..N-1` assigned in order. Both sides of a link
/// that build the table from the same id list agree on every code.
#[derive(Debug, Clone, Default)]
pub struct SpotCodeMap {
    by_code: Vec<String>,
    by_id: HashMap<String, u8>,
}

impl SpotCodeMap {
    /// Build the table from an id list. Ids beyond [`MAX_SPOTS`] after
    /// deduplication are dropped with a warning.
    pub fn build<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = ids.into_iter().map(Into::into).collect();
        if sorted.len() > MAX_SPOTS {
            warn!(
                total = sorted.len(),
                kept = MAX_SPOTS,
                "spot list exceeds one-byte code space, truncating"
            );
        }
        let by_code: Vec<String> = sorted.into_iter().take(MAX_SPOTS).collect();
        let by_id = by_code
            .iter()
            .enumerate()
            .map(|(code, id)| (id.clone(), code as u8))
            .collect();
        Self { by_code, by_id }
    }

    pub fn code(&self, spot_id: &str) -> Option<u8> {
        self.by_id.get(spot_id).copied()
    }

    pub fn spot_id(&self, code: u8) -> Option<&str> {
        self.by_code.get(usize::from(code)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Iterate `(code, spot id)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.by_code
            .iter()
            .enumerate()
            .map(|(code, id)| (code as u8, id.as_str()))
    }
}
