//! Pipeline states.

/// Where a mutating operation is in its life.
///
/// ```text
/// Built → Approving → Approved → Broadcasting → Pending → Confirmed
///             ↓                        ↓            ↓
///          Rejected             BroadcastFailed  Reverted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Built,
    Approving,
    Approved,
    Broadcasting,
    Pending,
    Confirmed,
    Rejected,
    BroadcastFailed,
    Reverted,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Confirmed
                | PipelineState::Rejected
                | PipelineState::BroadcastFailed
                | PipelineState::Reverted
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Built => "built",
            PipelineState::Approving => "approving",
            PipelineState::Approved => "approved",
            PipelineState::Broadcasting => "broadcasting",
            PipelineState::Pending => "pending",
            PipelineState::Confirmed => "confirmed",
            PipelineState::Rejected => "rejected",
            PipelineState::BroadcastFailed => "broadcast_failed",
            PipelineState::Reverted => "reverted",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
