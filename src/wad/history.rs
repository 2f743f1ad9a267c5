//! Snapshot-based undo / redo
//!
//! Because commits only ever append, every older table is still on disk and
//! a snapshot of header, write cursor and serial numbers is enough to go
//! back to it. Going back and then writing again overwrites the newer
//! revisions, so redo is discarded whenever the write cursor is reused.

use super::file::WadFile;
use super::format::WadHeader;
use crate::error::{Result, WadError};
use tracing::{debug, info};

/// Message recorded for the state an archive was opened in
pub const INITIAL_MESSAGE: &str = "open";

/// Message recorded by [`WadFile::commit`]
pub const DEFAULT_COMMIT_MESSAGE: &str = "commit";

/// Captured archive state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub(super) header: WadHeader,
    pub(super) write_pos: u64,
    pub(super) serials: Vec<u64>,
}

impl Snapshot {
    pub fn header(&self) -> &WadHeader {
        &self.header
    }

    pub fn write_pos(&self) -> u64 {
        self.write_pos
    }

    /// Serial numbers in directory order
    pub fn serials(&self) -> &[u64] {
        &self.serials
    }
}

#[derive(Debug, Clone)]
struct Revision {
    snapshot: Snapshot,
    message: String,
}

/// Linear revision list with a cursor
#[derive(Debug)]
pub(super) struct History {
    revisions: Vec<Revision>,
    current: usize,
    limit: Option<usize>,
}

impl History {
    pub(super) fn new(initial: Snapshot, limit: Option<usize>) -> Self {
        Self {
            revisions: vec![Revision {
                snapshot: initial,
                message: INITIAL_MESSAGE.to_string(),
            }],
            current: 0,
            limit,
        }
    }

    /// Forget everything and start again from `initial`
    pub(super) fn reset(&mut self, initial: Snapshot) {
        *self = Self::new(initial, self.limit);
    }

    pub(super) fn discard_redo(&mut self) {
        let dropped = self.revisions.len() - (self.current + 1);
        if dropped > 0 {
            self.revisions.truncate(self.current + 1);
            debug!("discarded {} redo revision(s)", dropped);
        }
    }

    pub(super) fn record(&mut self, snapshot: Snapshot, message: String) {
        self.discard_redo();
        self.revisions.push(Revision { snapshot, message });

        if let Some(limit) = self.limit {
            // Keep `limit` undo steps plus the current revision
            let excess = self.revisions.len().saturating_sub(limit + 1);
            if excess > 0 {
                self.revisions.drain(..excess);
            }
        }
        self.current = self.revisions.len() - 1;
    }

    fn current(&self) -> &Revision {
        &self.revisions[self.current]
    }

    fn undo_steps(&self) -> usize {
        self.current
    }

    fn redo_steps(&self) -> usize {
        self.revisions.len() - self.current - 1
    }
}

impl WadFile {
    /// Commit directory changes and record them as a revision.
    ///
    /// Returns false (and records nothing) when there was nothing to commit.
    pub fn commit_changes(&mut self, message: &str) -> Result<bool> {
        if !self.write_table()? {
            return Ok(false);
        }
        let snapshot = self.state.borrow().capture();
        self.history.record(snapshot, message.to_string());
        info!("committed: {}", message);
        Ok(true)
    }

    /// Step back one revision. Returns the first index that changed.
    ///
    /// Fails with [`WadError::UncommittedChanges`] while the directory has
    /// pending edits; commit or roll back first.
    pub fn undo(&mut self) -> Result<Option<usize>> {
        self.check_history_move()?;
        if self.history.undo_steps() == 0 {
            return Err(WadError::NoHistory("undo".to_string()));
        }

        let message = self.history.current().message.clone();
        self.history.current -= 1;
        let snapshot = self.history.current().snapshot.clone();
        let changed = self.state.borrow_mut().restore(&snapshot)?;
        info!("undid: {}", message);
        Ok(changed)
    }

    /// Step forward one revision. Returns the first index that changed.
    pub fn redo(&mut self) -> Result<Option<usize>> {
        self.check_history_move()?;
        if self.history.redo_steps() == 0 {
            return Err(WadError::NoHistory("redo".to_string()));
        }

        self.history.current += 1;
        let revision = self.history.current().clone();
        let changed = self.state.borrow_mut().restore(&revision.snapshot)?;
        info!("redid: {}", revision.message);
        Ok(changed)
    }

    fn check_history_move(&self) -> Result<()> {
        let state = self.state.borrow();
        state.check_mutable()?;
        if state.dirty {
            return Err(WadError::UncommittedChanges);
        }
        Ok(())
    }

    /// Number of revisions available to undo
    pub fn can_undo(&self) -> usize {
        self.history.undo_steps()
    }

    /// Number of revisions available to redo
    pub fn can_redo(&self) -> usize {
        self.history.redo_steps()
    }

    /// Message of the revision that would be undone next
    pub fn last_commit_message(&self) -> Option<&str> {
        if self.history.undo_steps() == 0 {
            return None;
        }
        Some(self.history.current().message.as_str())
    }

    /// Messages of all recorded revisions, oldest first, and the cursor
    pub fn revision_messages(&self) -> (Vec<&str>, usize) {
        let messages = self
            .history
            .revisions
            .iter()
            .map(|r| r.message.as_str())
            .collect();
        (messages, self.history.current)
    }

    /// Throw away uncommitted directory changes
    pub fn rollback(&mut self) -> Result<Option<usize>> {
        let snapshot = self.history.current().snapshot.clone();
        let changed = self.state.borrow_mut().restore(&snapshot)?;
        debug!("rolled back to last commit");
        Ok(changed)
    }

    /// Drop all undo and redo state; the current state becomes the base
    pub fn clear_history(&mut self) {
        let snapshot = self.state.borrow().capture();
        self.history.reset(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Stream;
    use crate::wad::file::tests::build_wad;

    fn memory_wad(lumps: &[(&str, &[u8])]) -> WadFile {
        WadFile::from_stream(Stream::memory(build_wad(lumps)), false).unwrap()
    }

    fn names(wad: &WadFile) -> Vec<String> {
        wad.entries().iter().map(|e| e.name()).collect()
    }

    #[test]
    fn test_commit_changes_records_revision() {
        let mut wad = memory_wad(&[("A", b"a")]);
        assert!(!wad.commit_changes("nothing").unwrap());
        assert_eq!(wad.can_undo(), 0);
        assert_eq!(wad.last_commit_message(), None);

        wad.set_lump_name(0, "B").unwrap();
        assert!(wad.commit_changes("rename").unwrap());
        assert_eq!(wad.can_undo(), 1);
        assert_eq!(wad.last_commit_message(), Some("rename"));
    }

    #[test]
    fn test_undo_redo_cycle() {
        let mut wad = memory_wad(&[("A", b"a"), ("B", b"b")]);
        wad.swap_entries(0, 1).unwrap();
        wad.commit_changes("swap").unwrap();
        wad.set_lump_name(0, "Z").unwrap();
        wad.commit_changes("rename").unwrap();
        assert_eq!(names(&wad), vec!["Z", "A"]);

        assert_eq!(wad.undo().unwrap(), Some(0));
        assert_eq!(names(&wad), vec!["B", "A"]);
        assert_eq!(wad.undo().unwrap(), Some(0));
        assert_eq!(names(&wad), vec!["A", "B"]);
        assert!(matches!(wad.undo(), Err(WadError::NoHistory(_))));
        assert_eq!(wad.can_redo(), 2);

        wad.redo().unwrap();
        wad.redo().unwrap();
        assert_eq!(names(&wad), vec!["Z", "A"]);
        assert!(matches!(wad.redo(), Err(WadError::NoHistory(_))));
    }

    #[test]
    fn test_new_commit_discards_redo() {
        let mut wad = memory_wad(&[("A", b"a")]);
        wad.set_lump_name(0, "B").unwrap();
        wad.commit_changes("first").unwrap();
        wad.undo().unwrap();
        assert_eq!(wad.can_redo(), 1);

        wad.set_lump_name(0, "C").unwrap();
        wad.commit_changes("second").unwrap();
        assert_eq!(wad.can_redo(), 0);
        assert_eq!(wad.can_undo(), 1);
        assert_eq!(wad.last_commit_message(), Some("second"));
    }

    #[test]
    fn test_rewrite_discards_redo() {
        let mut wad = memory_wad(&[("A", b"a")]);
        wad.set_lump_name(0, "B").unwrap();
        wad.commit_changes("rename").unwrap();
        wad.undo().unwrap();

        wad.write_lump(0, b"overwrites newer revisions").unwrap();
        assert_eq!(wad.can_redo(), 0);
    }

    #[test]
    fn test_rollback_discards_pending() {
        let mut wad = memory_wad(&[("A", b"a"), ("B", b"b")]);
        let serials = wad.serial_numbers();
        wad.delete_entry(0).unwrap();
        assert!(wad.need_commit());

        // Pending table changes were never written, so the last committed
        // table comes back with its serials
        assert_eq!(wad.rollback().unwrap(), Some(0));
        assert_eq!(wad.serial_numbers(), serials);
        assert!(!wad.need_commit());
    }

    #[test]
    fn test_plain_commit_records_revision() {
        let mut wad = memory_wad(&[("A", b"a")]);
        wad.set_lump_name(0, "B").unwrap();
        wad.commit_changes("rename").unwrap();
        wad.set_lump_name(0, "C").unwrap();
        assert!(wad.commit().unwrap());
        assert_eq!(wad.last_commit_message(), Some(DEFAULT_COMMIT_MESSAGE));

        wad.undo().unwrap();
        assert_eq!(names(&wad), vec!["B"]);
        wad.redo().unwrap();
        assert_eq!(names(&wad), vec!["C"]);
    }

    #[test]
    fn test_undo_refuses_pending_edits() {
        let mut wad = memory_wad(&[("A", b"a"), ("B", b"b")]);
        wad.swap_entries(0, 1).unwrap();
        wad.commit_changes("swap").unwrap();
        wad.undo().unwrap();

        wad.set_lump_name(0, "X").unwrap();
        assert!(matches!(wad.undo(), Err(WadError::UncommittedChanges)));
        assert!(matches!(wad.redo(), Err(WadError::UncommittedChanges)));
        assert_eq!(names(&wad), vec!["X", "B"]);
        assert_eq!(wad.can_redo(), 1);

        wad.rollback().unwrap();
        wad.redo().unwrap();
        assert_eq!(names(&wad), vec!["B", "A"]);
    }

    #[test]
    fn test_history_limit() {
        let mut wad = WadFile::from_stream_with(
            Stream::memory(build_wad(&[("A", b"a")])),
            false,
            crate::WadConfig {
                max_history: Some(2),
                ..Default::default()
            },
        )
        .unwrap();

        for name in ["B", "C", "D", "E"] {
            wad.set_lump_name(0, name).unwrap();
            wad.commit_changes(name).unwrap();
        }
        assert_eq!(wad.can_undo(), 2);
        let (messages, current) = wad.revision_messages();
        assert_eq!(messages, vec!["C", "D", "E"]);
        assert_eq!(current, 2);
    }
}
