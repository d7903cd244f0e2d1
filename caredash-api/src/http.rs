use async_trait::async_trait;
use caredash_core::{
    CareTeamAssignment, CareTeamMember, CareTeamRole, DashboardError, HealthScreening, Patient,
    PatientDetail, PatientPayload, PatientStatus, RecordId, RequestError,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{request_error, ApiConfig, CareApi, Operation, PatientFilter, PatientQuery};

/// [`CareApi`] over HTTP/JSON. No retries: a failed call is reported once.
#[derive(Debug, Clone)]
pub struct HttpCareApi {
    config: ApiConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ListParams<'a> {
    skip: u32,
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<PatientStatus>,
}

#[derive(Serialize)]
struct CountParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<PatientStatus>,
}

#[derive(Serialize)]
struct RoleParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<CareTeamRole>,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Serialize)]
struct AssignBody {
    care_team_member_id: RecordId,
}

impl HttpCareApi {
    pub fn new(config: ApiConfig) -> Result<Self, DashboardError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| DashboardError::InvalidConfig(format!("HTTP client: {err}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(method = method.as_str(), path, "api request");
        self.client
            .request(method, format!("{}{}", self.config.base_url(), path))
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        operation: Operation,
    ) -> Result<Response, RequestError> {
        let response = request.send().await.map_err(|err| {
            warn!(?operation, error = %err, "api request did not complete");
            RequestError::new(operation.fallback_message())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = request_error(operation, Some(status.as_u16()), &body);
        warn!(?operation, status = status.as_u16(), message = %err.message, "api request failed");
        Err(err)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: Operation,
    ) -> Result<T, RequestError> {
        let response = self.execute(request, operation).await?;
        let status = response.status().as_u16();
        response.json::<T>().await.map_err(|err| {
            warn!(?operation, error = %err, "api response body did not decode");
            RequestError::with_status(operation.fallback_message(), status)
        })
    }

    async fn send_empty(
        &self,
        request: RequestBuilder,
        operation: Operation,
    ) -> Result<(), RequestError> {
        self.execute(request, operation).await.map(|_| ())
    }
}

#[async_trait]
impl CareApi for HttpCareApi {
    async fn list_patients(&self, query: &PatientQuery) -> Result<Vec<Patient>, RequestError> {
        let params = ListParams {
            skip: query.offset,
            limit: query.limit,
            search: query.filter.search.as_deref(),
            status: query.filter.status,
        };
        let request = self.request(Method::GET, "/api/patients").query(&params);
        self.fetch(request, Operation::ListPatients).await
    }

    async fn count_patients(&self, filter: &PatientFilter) -> Result<u64, RequestError> {
        let params = CountParams {
            search: filter.search.as_deref(),
            status: filter.status,
        };
        let request = self
            .request(Method::GET, "/api/patients/count")
            .query(&params);
        let body: CountResponse = self.fetch(request, Operation::CountPatients).await?;
        Ok(body.count)
    }

    async fn get_patient(&self, id: RecordId) -> Result<PatientDetail, RequestError> {
        let request = self.request(Method::GET, &format!("/api/patients/{id}"));
        self.fetch(request, Operation::GetPatient).await
    }

    async fn create_patient(&self, payload: &PatientPayload) -> Result<Patient, RequestError> {
        let request = self.request(Method::POST, "/api/patients").json(payload);
        self.fetch(request, Operation::CreatePatient).await
    }

    async fn update_patient(
        &self,
        id: RecordId,
        payload: &PatientPayload,
    ) -> Result<Patient, RequestError> {
        let request = self
            .request(Method::PUT, &format!("/api/patients/{id}"))
            .json(payload);
        self.fetch(request, Operation::UpdatePatient).await
    }

    async fn delete_patient(&self, id: RecordId) -> Result<(), RequestError> {
        let request = self.request(Method::DELETE, &format!("/api/patients/{id}"));
        self.send_empty(request, Operation::DeletePatient).await
    }

    async fn list_care_team_members(
        &self,
        role: Option<CareTeamRole>,
    ) -> Result<Vec<CareTeamMember>, RequestError> {
        let request = self
            .request(Method::GET, "/api/care-team-members")
            .query(&RoleParams { role });
        self.fetch(request, Operation::ListCareTeamMembers).await
    }

    async fn get_care_team_member(&self, id: RecordId) -> Result<CareTeamMember, RequestError> {
        let request = self.request(Method::GET, &format!("/api/care-team-members/{id}"));
        self.fetch(request, Operation::GetCareTeamMember).await
    }

    async fn list_assignments(
        &self,
        patient_id: RecordId,
    ) -> Result<Vec<CareTeamAssignment>, RequestError> {
        let request = self.request(
            Method::GET,
            &format!("/api/patients/{patient_id}/care-team-assignments"),
        );
        self.fetch(request, Operation::ListAssignments).await
    }

    async fn assign_care_team_member(
        &self,
        patient_id: RecordId,
        member_id: RecordId,
    ) -> Result<CareTeamAssignment, RequestError> {
        let request = self
            .request(
                Method::POST,
                &format!("/api/patients/{patient_id}/care-team-assignments"),
            )
            .json(&AssignBody {
                care_team_member_id: member_id,
            });
        self.fetch(request, Operation::Assign).await
    }

    async fn unassign_care_team_member(
        &self,
        patient_id: RecordId,
        assignment_id: RecordId,
    ) -> Result<(), RequestError> {
        let request = self.request(
            Method::DELETE,
            &format!("/api/patients/{patient_id}/care-team-assignments/{assignment_id}"),
        );
        self.send_empty(request, Operation::Unassign).await
    }

    async fn list_screenings(
        &self,
        patient_id: RecordId,
    ) -> Result<Vec<HealthScreening>, RequestError> {
        let request = self.request(
            Method::GET,
            &format!("/api/patients/{patient_id}/health-screenings"),
        );
        self.fetch(request, Operation::ListScreenings).await
    }

    async fn get_screening(
        &self,
        screening_id: RecordId,
    ) -> Result<HealthScreening, RequestError> {
        let request = self.request(
            Method::GET,
            &format!("/api/health-screenings/{screening_id}"),
        );
        self.fetch(request, Operation::GetScreening).await
    }
}
