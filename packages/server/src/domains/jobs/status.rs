//! Job status and priority enums plus the legal-transition table.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Unassigned,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether `from -> to` is a legal lifecycle transition.
    ///
    /// `assigned -> assigned` is legal and means reassignment.
    pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
        use JobStatus::*;
        match (from, to) {
            (Unassigned, Assigned) => true,
            (Assigned, Assigned) => true, // reassignment
            (Assigned, InProgress) => true,
            (InProgress, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Low,
    Medium,
    High,
    Emergency,
}

impl JobPriority {
    /// Dispatch ordering rank: emergency first, low last.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Emergency => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "emergency" => Some(Self::Emergency),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use JobStatus::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(JobStatus::can_transition(Unassigned, Assigned));
        assert!(JobStatus::can_transition(Assigned, InProgress));
        assert!(JobStatus::can_transition(InProgress, Completed));
    }

    #[test]
    fn test_reassignment_is_legal() {
        assert!(JobStatus::can_transition(Assigned, Assigned));
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        assert!(JobStatus::can_transition(Unassigned, Cancelled));
        assert!(JobStatus::can_transition(Assigned, Cancelled));
        assert!(JobStatus::can_transition(InProgress, Cancelled));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for to in [Unassigned, Assigned, InProgress, Completed, Cancelled] {
            assert!(!JobStatus::can_transition(Completed, to));
            assert!(!JobStatus::can_transition(Cancelled, to));
        }
    }

    #[test]
    fn test_illegal_shortcuts() {
        assert!(!JobStatus::can_transition(Unassigned, InProgress));
        assert!(!JobStatus::can_transition(Unassigned, Completed));
        assert!(!JobStatus::can_transition(Assigned, Completed));
        assert!(!JobStatus::can_transition(InProgress, Assigned));
    }

    #[test]
    fn test_priority_rank_ordering() {
        assert!(JobPriority::Emergency.rank() < JobPriority::High.rank());
        assert!(JobPriority::High.rank() < JobPriority::Medium.rank());
        assert!(JobPriority::Medium.rank() < JobPriority::Low.rank());
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(JobPriority::parse("emergency"), Some(JobPriority::Emergency));
        assert_eq!(JobPriority::parse("urgent"), None);
    }
}
