//! Typed gateway to the care dashboard REST API.
//!
//! [`CareApi`] is the seam the view controllers are written against;
//! [`HttpCareApi`] is the reqwest implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use caredash_core::{
    CareTeamAssignment, CareTeamMember, CareTeamRole, DashboardError, HealthScreening, Patient,
    PatientDetail, PatientPayload, PatientStatus, RecordId, RequestError,
};
use serde::Serialize;
use serde_json::Value;

mod http;

pub use http::HttpCareApi;

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Connection settings, resolved once at startup and handed to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    base_url: String,
    request_timeout: Option<Duration>,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self, DashboardError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(DashboardError::InvalidConfig(
                "API base URL cannot be empty".into(),
            ));
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(DashboardError::InvalidConfig(format!(
                "API base URL must start with http:// or https://, got {trimmed:?}"
            )));
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            request_timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: None,
        }
    }
}

/// Filters shared by the list and count endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatientFilter {
    /// Free text matched against name, email and phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PatientStatus>,
}

impl PatientFilter {
    /// Blank search text means "no search".
    pub fn new(search: &str, status: Option<PatientStatus>) -> Self {
        Self {
            search: (!search.trim().is_empty()).then(|| search.to_string()),
            status,
        }
    }
}

/// One page request against `GET /api/patients`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientQuery {
    pub offset: u32,
    pub limit: u32,
    pub filter: PatientFilter,
}

impl PatientQuery {
    /// Query for 1-based `page` of size `page_size`.
    pub fn for_page(page: u32, page_size: u32, filter: PatientFilter) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(page_size),
            limit: page_size,
            filter,
        }
    }
}

/// Rows of one page plus the total under the same filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientPage {
    pub patients: Vec<Patient>,
    pub total: u64,
}

/// Every call the dashboard makes. Failures are already reduced to a
/// [`RequestError`] carrying a readable message.
#[async_trait]
pub trait CareApi: Send + Sync {
    async fn list_patients(&self, query: &PatientQuery) -> Result<Vec<Patient>, RequestError>;

    async fn count_patients(&self, filter: &PatientFilter) -> Result<u64, RequestError>;

    /// Page rows and total count, fetched together.
    async fn patient_page(&self, query: &PatientQuery) -> Result<PatientPage, RequestError> {
        let (patients, total) = futures::future::try_join(
            self.list_patients(query),
            self.count_patients(&query.filter),
        )
        .await?;
        Ok(PatientPage { patients, total })
    }

    async fn get_patient(&self, id: RecordId) -> Result<PatientDetail, RequestError>;

    async fn create_patient(&self, payload: &PatientPayload) -> Result<Patient, RequestError>;

    async fn update_patient(
        &self,
        id: RecordId,
        payload: &PatientPayload,
    ) -> Result<Patient, RequestError>;

    async fn delete_patient(&self, id: RecordId) -> Result<(), RequestError>;

    async fn list_care_team_members(
        &self,
        role: Option<CareTeamRole>,
    ) -> Result<Vec<CareTeamMember>, RequestError>;

    async fn get_care_team_member(&self, id: RecordId) -> Result<CareTeamMember, RequestError>;

    async fn list_assignments(
        &self,
        patient_id: RecordId,
    ) -> Result<Vec<CareTeamAssignment>, RequestError>;

    async fn assign_care_team_member(
        &self,
        patient_id: RecordId,
        member_id: RecordId,
    ) -> Result<CareTeamAssignment, RequestError>;

    /// Keyed by the assignment's own id, not the member's.
    async fn unassign_care_team_member(
        &self,
        patient_id: RecordId,
        assignment_id: RecordId,
    ) -> Result<(), RequestError>;

    async fn list_screenings(
        &self,
        patient_id: RecordId,
    ) -> Result<Vec<HealthScreening>, RequestError>;

    async fn get_screening(&self, screening_id: RecordId)
        -> Result<HealthScreening, RequestError>;
}

/// API operations, used to pick the message shown when the server does not
/// provide one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListPatients,
    CountPatients,
    GetPatient,
    CreatePatient,
    UpdatePatient,
    DeletePatient,
    ListCareTeamMembers,
    GetCareTeamMember,
    ListAssignments,
    Assign,
    Unassign,
    ListScreenings,
    GetScreening,
}

impl Operation {
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Self::ListPatients | Self::CountPatients => "Failed to load patients",
            Self::GetPatient => "Failed to load patient data",
            Self::CreatePatient | Self::UpdatePatient => "Failed to save patient",
            Self::DeletePatient => "Failed to delete patient",
            Self::ListCareTeamMembers | Self::GetCareTeamMember => {
                "Failed to load care team members"
            }
            Self::ListAssignments => "Failed to load care team assignments",
            Self::Assign => "Failed to assign care team member",
            Self::Unassign => "Failed to unassign care team member",
            Self::ListScreenings | Self::GetScreening => "Failed to load health screenings",
        }
    }
}

/// Pull a readable message out of an error response body.
///
/// Understands `{"detail": "..."}` and the validation form
/// `{"detail": [{"msg": "...", ...}]}`.
pub fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail")?;

    match detail {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(Value::as_str))
            .find(|msg| !msg.trim().is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Build the [`RequestError`] for a failed response.
pub fn request_error(operation: Operation, status: Option<u16>, body: &str) -> RequestError {
    let message =
        server_message(body).unwrap_or_else(|| operation.fallback_message().to_string());
    RequestError {
        message,
        status_code: status,
    }
}
