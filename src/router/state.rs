//! Per-request routing states.

use std::fmt;

use termrd_proto::ErrorCode;

/// Progress of one request through the router.
///
/// ```text
/// Received -> LicenseChecked -> Parsed -> Checked -> Executed -> Completed
///     \______________\______________\_________\__________\____> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Received,
    LicenseChecked,
    Parsed,
    Checked,
    Executed,
    Completed,
    Failed(ErrorCode),
}

impl RouteState {
    fn rank(self) -> u8 {
        match self {
            Self::Received => 0,
            Self::LicenseChecked => 1,
            Self::Parsed => 2,
            Self::Checked => 3,
            Self::Executed => 4,
            Self::Completed | Self::Failed(_) => 5,
        }
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    /// Move forward to `next`.
    ///
    /// Panics in debug builds on a backwards or out-of-order transition.
    pub fn advance(self, next: RouteState) -> RouteState {
        debug_assert!(!self.is_terminal(), "advance from terminal state {self}");
        debug_assert!(
            matches!(next, Self::Failed(_)) || next.rank() == self.rank() + 1,
            "invalid transition {self} -> {next}"
        );
        next
    }
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => f.write_str("received"),
            Self::LicenseChecked => f.write_str("license_checked"),
            Self::Parsed => f.write_str("parsed"),
            Self::Checked => f.write_str("checked"),
            Self::Executed => f.write_str("executed"),
            Self::Completed => f.write_str("completed"),
            Self::Failed(code) => write!(f, "failed({code})"),
        }
    }
}
