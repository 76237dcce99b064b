//! Revision bookkeeping for database-level undo sessions.
//!
//! The database pushes one undo layer per speculative scope across every
//! table at once; this tracker keeps the scope count and the permanent
//! ("irreversible") base revision in one place so the mapping
//! `revision = base + depth` cannot drift from the per-table layer stacks.

use crate::error::StoreError;

/// Tracks the undo-session stack of a whole multi-table store.
#[derive(Debug, Clone, Copy, Default)]
pub struct UndoState {
    /// Revision below which nothing can be undone
    base_revision: u64,
    /// Number of live undo layers on every table
    depth: usize,
}

impl UndoState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Head revision: base plus live layers.
    pub fn revision(&self) -> u64 {
        self.base_revision + self.depth as u64
    }

    pub fn base_revision(&self) -> u64 {
        self.base_revision
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Record a pushed session.
    pub fn on_push(&mut self) {
        self.depth += 1;
    }

    /// Record an undone session.
    pub fn on_undo(&mut self) -> Result<(), StoreError> {
        if self.depth == 0 {
            return Err(StoreError::NoActiveSession);
        }
        self.depth -= 1;
        Ok(())
    }

    /// Record a squash (two sessions collapse into one).
    pub fn on_squash(&mut self) -> Result<(), StoreError> {
        if self.depth == 0 {
            return Err(StoreError::NoActiveSession);
        }
        self.depth -= 1;
        Ok(())
    }

    /// Pin everything at or below `revision` as irreversible. Returns how
    /// many layers each table must commit.
    pub fn on_commit(&mut self, revision: u64) -> Result<usize, StoreError> {
        if revision > self.revision() {
            return Err(StoreError::RevisionAhead {
                requested: revision,
                head: self.revision(),
            });
        }
        let to_commit = revision.saturating_sub(self.base_revision) as usize;
        let to_commit = to_commit.min(self.depth);
        self.base_revision += to_commit as u64;
        self.depth -= to_commit;
        Ok(to_commit)
    }

    /// Align the base revision with an externally-known height (startup).
    pub fn set_base_revision(&mut self, revision: u64) {
        debug_assert_eq!(self.depth, 0, "cannot rebase with live sessions");
        self.base_revision = revision;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_tracks_push_undo_commit() {
        let mut s = UndoState::new();
        assert_eq!(s.revision(), 0);

        s.on_push();
        s.on_push();
        s.on_push();
        assert_eq!(s.revision(), 3);

        s.on_undo().unwrap();
        assert_eq!(s.revision(), 2);

        let committed = s.on_commit(1).unwrap();
        assert_eq!(committed, 1);
        assert_eq!(s.base_revision(), 1);
        assert_eq!(s.revision(), 2);

        assert!(s.on_commit(5).is_err());
    }
}
