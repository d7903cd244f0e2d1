//! View-state controllers for the patient list and patient detail screens.
//!
//! Controllers own their state exclusively and talk to the server only
//! through [`caredash_api::CareApi`]. Anything that needs the user (a yes/no
//! confirmation, a blocking notification) goes through [`UserPrompt`].

use std::fmt;
use std::str::FromStr;

use caredash_core::{DashboardError, RecordId};

pub mod detail;
pub mod list;

pub use detail::{unassigned_members, DetailMode, DetailViewController};
pub use list::{ListTicket, ListViewController, ListViewState};

/// The front end's confirmation dialog and alert box.
pub trait UserPrompt {
    /// Ask a yes/no question. `false` cancels the action.
    fn confirm(&mut self, question: &str) -> bool;
    /// Show a dismissible, blocking message.
    fn notify(&mut self, message: &str);
}

/// Result of a user-initiated action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// The user answered "no" to the confirmation.
    Declined,
    /// Nothing to act on in the current state.
    Skipped,
    /// Failed; the message has already been shown through [`UserPrompt::notify`].
    Failed(String),
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Identity a detail view is opened with: an existing record or `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientRef {
    New,
    Existing(RecordId),
}

impl PatientRef {
    pub fn id(&self) -> Option<RecordId> {
        match self {
            Self::New => None,
            Self::Existing(id) => Some(*id),
        }
    }
}

impl fmt::Display for PatientRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str("new"),
            Self::Existing(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for PatientRef {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "new" {
            return Ok(Self::New);
        }
        trimmed
            .parse::<RecordId>()
            .map(Self::Existing)
            .map_err(|_| DashboardError::InvalidPatientRef(s.to_string()))
    }
}
