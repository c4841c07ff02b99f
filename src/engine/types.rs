#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Sleeping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Batch committed (possibly empty).
    Committed,
    /// Feed call failed; storage untouched.
    FetchFailed,
    /// Batch rolled back; storage untouched.
    CommitFailed,
}

// What one tick did, for logs, metrics and `coinx refresh-once`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub fetched: usize,
    pub applied: usize,
    pub timestamp_fallbacks: usize,
    pub outcome: TickOutcome,
}

impl TickReport {
    pub fn fetch_failed() -> Self {
        Self { fetched: 0, applied: 0, timestamp_fallbacks: 0, outcome: TickOutcome::FetchFailed }
    }

    pub fn is_committed(&self) -> bool {
        self.outcome == TickOutcome::Committed
    }
}
