//! Append-only, de-duplicated status history.

use mission_core::enums::MissionStatus;

/// Ordered status tags explaining how a mission degraded or concluded.
#[derive(Debug, Clone, Default)]
pub struct StatusHistory {
    tags: Vec<MissionStatus>,
}

impl StatusHistory {
    /// Append a tag unless already present. Returns whether it was appended.
    pub fn add(&mut self, status: MissionStatus) -> bool {
        if self.tags.contains(&status) {
            return false;
        }
        self.tags.push(status);
        true
    }

    pub fn contains(&self, status: &MissionStatus) -> bool {
        self.tags.contains(status)
    }

    pub fn as_slice(&self) -> &[MissionStatus] {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Most recent tag that is not a success outcome.
    pub fn last_failure(&self) -> Option<&MissionStatus> {
        self.tags.iter().rev().find(|s| !s.is_success())
    }
}
