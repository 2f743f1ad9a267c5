use std::collections::BTreeSet;

/// A selection of directory entries, keyed by serial number.
///
/// Because it holds serials rather than indices, a selection survives
/// refreshes that reorder the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    serials: BTreeSet<u64>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the serial was already present
    pub fn add(&mut self, serial: u64) -> bool {
        self.serials.insert(serial)
    }

    /// Returns false if the serial was not present
    pub fn remove(&mut self, serial: u64) -> bool {
        self.serials.remove(&serial)
    }

    /// Add if absent, remove if present
    pub fn toggle(&mut self, serial: u64) {
        if !self.serials.remove(&serial) {
            self.serials.insert(serial);
        }
    }

    pub fn contains(&self, serial: u64) -> bool {
        self.serials.contains(&serial)
    }

    pub fn len(&self) -> usize {
        self.serials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.serials.is_empty()
    }

    pub fn clear(&mut self) {
        self.serials.clear();
    }

    /// Serials in ascending order. Use
    /// [`super::Directory::iter_set`] for directory order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.serials.iter().copied()
    }
}

impl FromIterator<u64> for FileSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            serials: iter.into_iter().collect(),
        }
    }
}

impl Extend<u64> for FileSet {
    fn extend<I: IntoIterator<Item = u64>>(&mut self, iter: I) {
        self.serials.extend(iter);
    }
}
