//! Domain model shared by the care dashboard crates: patients, care-team
//! members and assignments, health screenings, configuration and errors.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod trend;

pub use trend::{summarize_screenings, ChartPoint, ScreeningSummary, Trend};

/// Server-assigned identity of any record.
pub type RecordId = i64;

/// Tuning knobs for list paging and screening analytics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    /// Rows per list page.
    pub page_size: u32,
    /// Score delta below which a screening history counts as stable.
    pub stable_threshold: f64,
    /// `chrono` format string for chart x-axis labels.
    pub chart_date_format: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            stable_threshold: 0.5,
            chart_date_format: "%b %d, %Y".to_string(),
        }
    }
}

/// Display band of a screening score, most severe first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Moderate,
    Low,
}

/// Enrollment status of a patient. Closed set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    Active,
    Inactive,
    Discharged,
}

impl PatientStatus {
    pub const ALL: [PatientStatus; 3] = [Self::Active, Self::Inactive, Self::Discharged];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Discharged => "discharged",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatientStatus {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DashboardError::Parse(format!("unknown patient status {s:?}")))
    }
}

/// Role a care-team member plays. Closed set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CareTeamRole {
    #[serde(rename = "Health Coach")]
    HealthCoach,
    #[serde(rename = "Behavioral Health Care Manager")]
    BehavioralHealthCareManager,
    #[serde(rename = "Psychiatrist")]
    Psychiatrist,
}

impl CareTeamRole {
    pub const ALL: [CareTeamRole; 3] = [
        Self::HealthCoach,
        Self::BehavioralHealthCareManager,
        Self::Psychiatrist,
    ];

    /// Wire value, also used as the display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HealthCoach => "Health Coach",
            Self::BehavioralHealthCareManager => "Behavioral Health Care Manager",
            Self::Psychiatrist => "Psychiatrist",
        }
    }

    fn short_name(&self) -> &'static str {
        match self {
            Self::HealthCoach => "health-coach",
            Self::BehavioralHealthCareManager => "bhcm",
            Self::Psychiatrist => "psychiatrist",
        }
    }
}

impl fmt::Display for CareTeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CareTeamRole {
    type Err = DashboardError;

    /// Accepts either the wire label or the short command-line name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| {
                role.as_str().eq_ignore_ascii_case(wanted)
                    || role.short_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| DashboardError::Parse(format!("unknown care team role {s:?}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub enrollment_date: NaiveDate,
    pub status: PatientStatus,
    #[serde(default)]
    pub care_program: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A patient together with the nested records the detail endpoint embeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientDetail {
    #[serde(flatten)]
    pub patient: Patient,
    #[serde(default)]
    pub care_team_assignments: Vec<CareTeamAssignment>,
    #[serde(default)]
    pub health_screenings: Vec<HealthScreening>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareTeamMember {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: CareTeamRole,
}

impl CareTeamMember {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Link between a patient and a care-team member. Never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareTeamAssignment {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub care_team_member_id: RecordId,
    pub assigned_date: NaiveDate,
    /// Member snapshot embedded by the server for display.
    pub care_team_member: CareTeamMember,
}

/// One screening result. Scores run 0 to 10, lower is better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthScreening {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub screening_date: NaiveDate,
    pub score: f64,
}

impl HealthScreening {
    pub fn severity(&self) -> Severity {
        score_severity(self.score)
    }
}

/// Display band for a screening score.
pub fn score_severity(score: f64) -> Severity {
    if score >= 7.0 {
        Severity::High
    } else if score >= 4.0 {
        Severity::Moderate
    } else {
        Severity::Low
    }
}

/// Body sent on patient create and update.
///
/// Every field is always present. The server only touches keys that are
/// sent, so a cleared optional field has to go out as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientPayload {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub enrollment_date: NaiveDate,
    pub status: PatientStatus,
    pub care_program: Option<String>,
}

/// Editable working copy of a patient. Text fields are kept as typed by the
/// user; blanks turn into `None` only when the payload is built.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub date_of_birth: Option<NaiveDate>,
    pub enrollment_date: Option<NaiveDate>,
    pub status: PatientStatus,
    pub care_program: String,
}

impl PatientDraft {
    /// Blank draft for create mode: enrolled `today`, status active.
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            phone: String::new(),
            address: String::new(),
            date_of_birth: None,
            enrollment_date: Some(today),
            status: PatientStatus::Active,
            care_program: String::new(),
        }
    }

    /// Names of required fields that are still empty, in form order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.first_name.trim().is_empty() {
            missing.push("first_name");
        }
        if self.last_name.trim().is_empty() {
            missing.push("last_name");
        }
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.date_of_birth.is_none() {
            missing.push("date_of_birth");
        }
        if self.enrollment_date.is_none() {
            missing.push("enrollment_date");
        }
        missing
    }

    pub fn to_payload(&self) -> Result<PatientPayload, DashboardError> {
        if let Some(field) = self.missing_required().into_iter().next() {
            return Err(DashboardError::MissingField(field));
        }
        let (Some(date_of_birth), Some(enrollment_date)) =
            (self.date_of_birth, self.enrollment_date)
        else {
            return Err(DashboardError::MissingField("date_of_birth"));
        };

        Ok(PatientPayload {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            date_of_birth,
            email: self.email.trim().to_string(),
            phone: non_blank(&self.phone),
            address: non_blank(&self.address),
            enrollment_date,
            status: self.status,
            care_program: non_blank(&self.care_program),
        })
    }
}

impl From<&Patient> for PatientDraft {
    fn from(patient: &Patient) -> Self {
        Self {
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            email: patient.email.clone(),
            phone: patient.phone.clone().unwrap_or_default(),
            address: patient.address.clone().unwrap_or_default(),
            date_of_birth: Some(patient.date_of_birth),
            enrollment_date: Some(patient.enrollment_date),
            status: patient.status,
            care_program: patient.care_program.clone().unwrap_or_default(),
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Failure of a single API call, already reduced to something a user can read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RequestError {
    pub message: String,
    pub status_code: Option<u16>,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}

/// Local failures that never reach the network.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("required field is empty: {0}")]
    MissingField(&'static str),
    #[error("not a patient id: {0:?}")]
    InvalidPatientRef(String),
    #[error("parse error: {0}")]
    Parse(String),
}
