//! Most-free-space-first placement.
//!
//! Candidates whose mount does not have strictly more than `size_kb` free are
//! dropped; of the rest the one with the most free space wins, the earliest
//! candidate on ties. There is no lookahead: callers charge the chosen mount
//! before placing the next file.

use crate::datastore::Datastore;

/// Pick the candidate with the most free space that can hold `size_kb`.
pub fn select_by<T, F>(candidates: impl IntoIterator<Item = T>, size_kb: i64, free_kb: F) -> Option<T>
where
    F: Fn(&T) -> i64,
{
    candidates
        .into_iter()
        .map(|c| {
            let free = free_kb(&c);
            (c, free)
        })
        .filter(|(_, free)| *free > size_kb)
        .fold(None, |best: Option<(T, i64)>, (c, free)| match best {
            Some((_, best_free)) if best_free >= free => best,
            _ => Some((c, free)),
        })
        .map(|(c, _)| c)
}

/// [`select_by`] over datastores, ranked by [`Datastore::score_for_placement`].
pub fn select_datastore<'a, K>(
    candidates: impl IntoIterator<Item = (K, &'a Datastore)>,
    size_kb: i64,
) -> Option<K> {
    select_by(candidates, size_kb, |(_, store)| store.score_for_placement()).map(|(k, _)| k)
}
