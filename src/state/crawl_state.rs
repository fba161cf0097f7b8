//! Process-scoped crawl state
//!
//! Owned and mutated by the coordinator only. Nothing here is persisted; a
//! restarted crawl rebuilds it from the record sink.

use crate::crawler::Deduplicator;

/// Lifecycle of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Running,
    Terminated { success: bool },
}

impl CrawlPhase {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Terminated { success: true })
    }
}

/// Pages and records accumulated since the last checkpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointWindow {
    first_page: Option<u32>,
    last_page: Option<u32>,
    productive_pages: u32,
    uncommitted_records: usize,
}

impl CheckpointWindow {
    /// Records a successfully processed page and how many new records it added
    pub fn record_page(&mut self, page_number: u32, new_records: usize) {
        if self.first_page.is_none() {
            self.first_page = Some(page_number);
        }
        self.last_page = Some(page_number);

        if new_records > 0 {
            self.productive_pages += 1;
            self.uncommitted_records += new_records;
        }
    }

    /// Pages that added at least one record since the last checkpoint
    pub fn productive_pages(&self) -> u32 {
        self.productive_pages
    }

    pub fn uncommitted_records(&self) -> usize {
        self.uncommitted_records
    }

    pub fn has_uncommitted(&self) -> bool {
        self.uncommitted_records > 0
    }

    /// Whether the periodic checkpoint is due
    pub fn is_due(&self, interval: u32) -> bool {
        interval > 0 && self.productive_pages >= interval
    }

    /// First and last page covered, in crawl order
    pub fn span(&self) -> Option<(u32, u32)> {
        Some((self.first_page?, self.last_page?))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Mutable state of one crawl
#[derive(Debug)]
pub struct CrawlState {
    pub phase: CrawlPhase,
    pub current_page: u32,
    pub consecutive_failures: u32,
    pub window: CheckpointWindow,
    pub known_keys: Deduplicator,
}

impl CrawlState {
    pub fn new(start_page: u32, known_keys: Deduplicator) -> Self {
        Self {
            phase: CrawlPhase::Running,
            current_page: start_page,
            consecutive_failures: 0,
            window: CheckpointWindow::default(),
            known_keys,
        }
    }

    /// Counts one failed page
    ///
    /// Returns true when `threshold` consecutive failures have been reached.
    pub fn record_failure(&mut self, threshold: u32) -> bool {
        self.consecutive_failures += 1;
        self.consecutive_failures >= threshold
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn terminate(&mut self, success: bool) {
        self.phase = CrawlPhase::Terminated { success };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_threshold() {
        let mut state = CrawlState::new(10, Deduplicator::new());
        for _ in 0..4 {
            assert!(!state.record_failure(5));
        }
        assert!(state.record_failure(5));
        assert_eq!(state.consecutive_failures, 5);
    }

    #[test]
    fn test_success_resets_failures() {
        let mut state = CrawlState::new(10, Deduplicator::new());
        state.record_failure(5);
        state.record_failure(5);
        state.record_success();
        assert_eq!(state.consecutive_failures, 0);
    }

    #[test]
    fn test_phase_transitions() {
        let mut state = CrawlState::new(1, Deduplicator::new());
        assert!(state.phase.is_running());
        state.terminate(false);
        assert_eq!(state.phase, CrawlPhase::Terminated { success: false });
        assert!(!state.phase.is_success());
    }

    #[test]
    fn test_window_counts_only_productive_pages() {
        let mut window = CheckpointWindow::default();
        window.record_page(30, 2);
        window.record_page(29, 0);
        window.record_page(28, 5);

        assert_eq!(window.productive_pages(), 2);
        assert_eq!(window.uncommitted_records(), 7);
        assert_eq!(window.span(), Some((30, 28)));
        assert!(window.is_due(2));
        assert!(!window.is_due(3));

        window.reset();
        assert_eq!(window.span(), None);
        assert!(!window.has_uncommitted());
    }

    #[test]
    fn test_window_without_new_records_has_nothing_to_commit() {
        let mut window = CheckpointWindow::default();
        window.record_page(5, 0);
        assert_eq!(window.span(), Some((5, 5)));
        assert!(!window.has_uncommitted());
    }
}
