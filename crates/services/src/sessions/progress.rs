/// Lifecycle of a running attempt.
///
/// A session that has not started yet has no handle at all, so there is no
/// `NotStarted` phase here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    InProgress,
    /// The result is being written; navigation and choices are closed.
    Finishing,
    Finished,
    Cancelled,
}

impl SessionPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

/// Snapshot published to subscribers whenever the session changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub remaining_secs: u32,
    pub timer_active: bool,
    /// The countdown is on hold, e.g. while a confirmation prompt is open.
    pub paused: bool,
    pub current_index: usize,
    pub total: usize,
    pub answered: usize,
}
