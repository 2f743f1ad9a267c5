//! Moving and sorting entries
//!
//! Everything here is expressed as a sequence of
//! [`Directory::swap_entries`] calls, the one reordering primitive a backend
//! has to provide.

use super::directory::Directory;
use super::set::FileSet;
use crate::error::Result;
use std::cmp::Ordering;
use tracing::debug;

/// True when `indexes` is a run of consecutive values
pub fn indexes_are_contiguous(indexes: &[usize]) -> bool {
    indexes.windows(2).all(|w| w[1] == w[0] + 1)
}

/// Moving `indexes` to land before `insert_before` would change nothing
pub fn is_move_noop(indexes: &[usize], insert_before: usize) -> bool {
    match (indexes.first(), indexes.last()) {
        (Some(&first), Some(&last)) => {
            indexes_are_contiguous(indexes)
                && insert_before >= first
                && insert_before <= last + 1
        }
        _ => true,
    }
}

/// Old index -> new index for moving the (ascending) `tagged` indexes so
/// they land together before `insert_before`.
///
/// Tagged entries before the target leave the array, so the landing point
/// shifts left by their count; it is returned with the mapping. Untagged
/// entries fill the remaining slots in their original order.
pub fn move_mapping(len: usize, tagged: &[usize], insert_before: usize) -> (Vec<usize>, usize) {
    let insert_before = insert_before.min(len);
    let shift = tagged.iter().take_while(|&&i| i < insert_before).count();
    let start = insert_before - shift;
    let end = start + tagged.len();

    let mut mapping: Vec<Option<usize>> = vec![None; len];
    for (offset, &index) in tagged.iter().enumerate() {
        mapping[index] = Some(start + offset);
    }

    let mut next = 0;
    for slot in mapping.iter_mut().filter(|slot| slot.is_none()) {
        if (start..end).contains(&next) {
            next = end;
        }
        *slot = Some(next);
        next += 1;
    }

    (mapping.into_iter().flatten().collect(), start)
}

impl Directory {
    /// Move every entry in `set` to land, in order, before `insert_before`.
    /// Returns the index of the first moved entry.
    pub fn move_entries(&mut self, set: &FileSet, insert_before: usize) -> Result<usize> {
        let tagged = self.indexes_for_set(set);
        let (mut mapping, start) = move_mapping(self.len(), &tagged, insert_before);

        // Each entry starts a cycle of swaps that ends back at it
        let mut swaps = 0;
        for i in 0..mapping.len() {
            let mut j = mapping[i];
            while j != i {
                self.swap_entries(i, j)?;
                swaps += 1;
                let next = mapping[j];
                mapping[j] = j;
                j = next;
            }
        }

        debug!("moved {} entries to {} in {} swaps", tagged.len(), start, swaps);
        Ok(start)
    }

    fn compare_entries(&self, a: usize, b: usize) -> Ordering {
        let (x, y) = (&self.entries()[a], &self.entries()[b]);
        x.name.as_bytes().cmp(y.name.as_bytes()).then(a.cmp(&b))
    }

    /// The entries at `indexes` are already in name order
    pub fn is_sorted(&self, indexes: &[usize]) -> bool {
        indexes
            .windows(2)
            .all(|w| self.compare_entries(w[0], w[1]) != Ordering::Greater)
    }

    /// Sort the entries at `indexes` by name among themselves. Other
    /// entries do not move, so `indexes` need not be contiguous.
    pub fn sort_entries(&mut self, indexes: &[usize]) -> Result<()> {
        if indexes.len() < 2 {
            return Ok(());
        }

        // Middle pivot, parked at the front
        self.swap_entries(indexes[indexes.len() / 2], indexes[0])?;
        let mut pivot = 0;

        for i in 1..indexes.len() {
            if self.compare_entries(indexes[i], indexes[pivot]) == Ordering::Less {
                self.swap_entries(indexes[i], indexes[pivot])?;
                pivot += 1;
                self.swap_entries(indexes[i], indexes[pivot])?;
            }
        }

        self.sort_entries(&indexes[..pivot])?;
        self.sort_entries(&indexes[pivot + 1..])
    }

    /// Reverse the order of the entries at `indexes`
    pub fn reverse_entries(&mut self, indexes: &[usize]) -> Result<()> {
        let n = indexes.len();
        for i in 0..n / 2 {
            self.swap_entries(indexes[i], indexes[n - i - 1])?;
        }
        Ok(())
    }
}
