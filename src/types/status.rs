use serde::{Deserialize, Serialize};

/// Lifecycle of a company invitation. Joined and Declined are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    AwaitingResponse,
    Joined,
    Declined,
}

impl InvitationStatus {
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::AwaitingResponse => 0,
            Self::Joined => 1,
            Self::Declined => 2,
        }
    }

    #[must_use]
    pub const fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::AwaitingResponse),
            1 => Some(Self::Joined),
            2 => Some(Self::Declined),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::AwaitingResponse)
    }
}

/// Publication state of a post. There is no automatic promotion from
/// Scheduled to Published; the status only changes through an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Scheduled,
    Published,
}

impl PostStatus {
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Draft => 0,
            Self::Scheduled => 1,
            Self::Published => 2,
        }
    }

    #[must_use]
    pub const fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Draft),
            1 => Some(Self::Scheduled),
            2 => Some(Self::Published),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_status_round_trip() {
        for status in [
            InvitationStatus::AwaitingResponse,
            InvitationStatus::Joined,
            InvitationStatus::Declined,
        ] {
            assert_eq!(InvitationStatus::from_i64(status.as_i64()), Some(status));
        }
        assert_eq!(InvitationStatus::from_i64(3), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!InvitationStatus::AwaitingResponse.is_terminal());
        assert!(InvitationStatus::Joined.is_terminal());
        assert!(InvitationStatus::Declined.is_terminal());
    }

    #[test]
    fn test_post_status_ordinals() {
        assert_eq!(PostStatus::Draft.as_i64(), 0);
        assert_eq!(PostStatus::Scheduled.as_i64(), 1);
        assert_eq!(PostStatus::Published.as_i64(), 2);
        assert_eq!(PostStatus::from_i64(2), Some(PostStatus::Published));
        assert_eq!(PostStatus::from_i64(-1), None);
    }
}
