/// Rendering phase of one tracked resource, derived from its percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    /// Nothing transferred yet.
    Waiting,
    /// Transfer in progress.
    Syncing,
    /// Fully transferred.
    Completed,
}

impl TargetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Syncing => "syncing",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TargetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a daemon-supplied percent into 0..=100.
pub fn clamp_percent(percent: i64) -> u8 {
    percent.clamp(0, 100) as u8
}

/// Map a percent to its rendering phase: 0 is waiting, 100 is completed,
/// everything in between is syncing. Out-of-range input is clamped first.
pub fn classify(percent: i64) -> TargetState {
    match clamp_percent(percent) {
        0 => TargetState::Waiting,
        100 => TargetState::Completed,
        _ => TargetState::Syncing,
    }
}
