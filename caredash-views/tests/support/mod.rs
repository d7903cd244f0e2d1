//! In-memory `CareApi` and a scripted prompt for controller tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use caredash_api::{CareApi, Operation, PatientFilter, PatientQuery};
use caredash_core::{
    CareTeamAssignment, CareTeamMember, CareTeamRole, HealthScreening, Patient, PatientDetail,
    PatientPayload, PatientStatus, RecordId, RequestError,
};
use caredash_views::UserPrompt;
use chrono::NaiveDate;

pub fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid date")
}

pub fn patient(id: RecordId, first: &str, last: &str, status: PatientStatus) -> Patient {
    Patient {
        id,
        first_name: first.to_string(),
        last_name: last.to_string(),
        date_of_birth: date("1980-01-01"),
        email: format!("{}.{}@example.org", first.to_lowercase(), last.to_lowercase()),
        phone: None,
        address: None,
        enrollment_date: date("2024-01-01"),
        status,
        care_program: None,
    }
}

pub fn member(id: RecordId, first: &str, role: CareTeamRole) -> CareTeamMember {
    CareTeamMember {
        id,
        first_name: first.to_string(),
        last_name: "Staff".to_string(),
        email: format!("{}@example.org", first.to_lowercase()),
        phone: None,
        role,
    }
}

pub fn screening(id: RecordId, patient_id: RecordId, day: &str, score: f64) -> HealthScreening {
    HealthScreening {
        id,
        patient_id,
        screening_date: date(day),
        score,
    }
}

#[derive(Default)]
pub struct FakeState {
    pub patients: Vec<Patient>,
    pub members: Vec<CareTeamMember>,
    pub assignments: Vec<CareTeamAssignment>,
    pub screenings: Vec<HealthScreening>,
    pub next_id: RecordId,
    pub list_queries: Vec<PatientQuery>,
    pub calls: Vec<&'static str>,
    failures: HashMap<&'static str, RequestError>,
}

/// Shared handle: clones see the same state, so a test can keep one copy
/// while the controller owns another.
#[derive(Clone, Default)]
pub struct FakeApi {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.state().next_id = 1000;
        api
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().expect("fake state poisoned")
    }

    pub fn with_patients(self, patients: Vec<Patient>) -> Self {
        self.state().patients = patients;
        self
    }

    pub fn with_members(self, members: Vec<CareTeamMember>) -> Self {
        self.state().members = members;
        self
    }

    pub fn with_screenings(self, screenings: Vec<HealthScreening>) -> Self {
        self.state().screenings = screenings;
        self
    }

    /// Make every call named `call` fail until [`Self::heal`].
    pub fn fail(&self, call: &'static str, err: RequestError) {
        self.state().failures.insert(call, err);
    }

    pub fn heal(&self, call: &'static str) {
        self.state().failures.remove(call);
    }

    pub fn assign_directly(&self, patient_id: RecordId, member_id: RecordId) -> RecordId {
        let mut state = self.state();
        let member = state
            .members
            .iter()
            .find(|m| m.id == member_id)
            .cloned()
            .expect("member exists");
        state.next_id += 1;
        let id = state.next_id;
        state.assignments.push(CareTeamAssignment {
            id,
            patient_id,
            care_team_member_id: member_id,
            assigned_date: date("2024-02-01"),
            care_team_member: member,
        });
        id
    }

    fn enter(&self, call: &'static str) -> Result<MutexGuard<'_, FakeState>, RequestError> {
        let mut state = self.state();
        state.calls.push(call);
        if let Some(err) = state.failures.get(call).cloned() {
            return Err(err);
        }
        Ok(state)
    }
}

fn matches_filter(patient: &Patient, filter: &PatientFilter) -> bool {
    if let Some(status) = filter.status {
        if patient.status != status {
            return false;
        }
    }
    let Some(search) = filter.search.as_deref() else {
        return true;
    };
    let needle = search.to_lowercase();
    [
        Some(patient.first_name.as_str()),
        Some(patient.last_name.as_str()),
        Some(patient.email.as_str()),
        patient.phone.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

fn not_found(what: &str) -> RequestError {
    RequestError::with_status(format!("{what} not found"), 404)
}

fn from_payload(id: RecordId, payload: &PatientPayload) -> Patient {
    Patient {
        id,
        first_name: payload.first_name.clone(),
        last_name: payload.last_name.clone(),
        date_of_birth: payload.date_of_birth,
        email: payload.email.clone(),
        phone: payload.phone.clone(),
        address: payload.address.clone(),
        enrollment_date: payload.enrollment_date,
        status: payload.status,
        care_program: payload.care_program.clone(),
    }
}

#[async_trait]
impl CareApi for FakeApi {
    async fn list_patients(&self, query: &PatientQuery) -> Result<Vec<Patient>, RequestError> {
        let mut state = self.enter("list_patients")?;
        state.list_queries.push(query.clone());
        let mut rows: Vec<Patient> = state
            .patients
            .iter()
            .filter(|p| matches_filter(p, &query.filter))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn count_patients(&self, filter: &PatientFilter) -> Result<u64, RequestError> {
        let state = self.enter("count_patients")?;
        Ok(state
            .patients
            .iter()
            .filter(|p| matches_filter(p, filter))
            .count() as u64)
    }

    async fn get_patient(&self, id: RecordId) -> Result<PatientDetail, RequestError> {
        let state = self.enter("get_patient")?;
        let patient = state
            .patients
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found("Patient"))?;
        Ok(PatientDetail {
            patient,
            care_team_assignments: Vec::new(),
            health_screenings: Vec::new(),
        })
    }

    async fn create_patient(&self, payload: &PatientPayload) -> Result<Patient, RequestError> {
        let mut state = self.enter("create_patient")?;
        if state.patients.iter().any(|p| p.email == payload.email) {
            return Err(RequestError::with_status("Email already registered", 400));
        }
        state.next_id += 1;
        let created = from_payload(state.next_id, payload);
        state.patients.push(created.clone());
        Ok(created)
    }

    async fn update_patient(
        &self,
        id: RecordId,
        payload: &PatientPayload,
    ) -> Result<Patient, RequestError> {
        let mut state = self.enter("update_patient")?;
        let slot = state
            .patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("Patient"))?;
        // Only keys present in the body are applied; absent keys keep the
        // stored value.
        let mut record = serde_json::to_value(&*slot).expect("patient serializes");
        let body = serde_json::to_value(payload).expect("payload serializes");
        if let (Some(record), Some(body)) = (record.as_object_mut(), body.as_object()) {
            for (key, value) in body {
                record.insert(key.clone(), value.clone());
            }
        }
        let mut updated: Patient = serde_json::from_value(record).expect("merged patient");
        // Server-side normalization the client must pick up on reload.
        updated.email = updated.email.to_lowercase();
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete_patient(&self, id: RecordId) -> Result<(), RequestError> {
        let mut state = self.enter("delete_patient")?;
        let before = state.patients.len();
        state.patients.retain(|p| p.id != id);
        if state.patients.len() == before {
            return Err(not_found("Patient"));
        }
        Ok(())
    }

    async fn list_care_team_members(
        &self,
        role: Option<CareTeamRole>,
    ) -> Result<Vec<CareTeamMember>, RequestError> {
        let state = self.enter("list_care_team_members")?;
        Ok(state
            .members
            .iter()
            .filter(|m| role.map_or(true, |r| m.role == r))
            .cloned()
            .collect())
    }

    async fn get_care_team_member(&self, id: RecordId) -> Result<CareTeamMember, RequestError> {
        let state = self.enter("get_care_team_member")?;
        state
            .members
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| not_found("Care team member"))
    }

    async fn list_assignments(
        &self,
        patient_id: RecordId,
    ) -> Result<Vec<CareTeamAssignment>, RequestError> {
        let state = self.enter("list_assignments")?;
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn assign_care_team_member(
        &self,
        patient_id: RecordId,
        member_id: RecordId,
    ) -> Result<CareTeamAssignment, RequestError> {
        let mut state = self.enter("assign_care_team_member")?;
        if state
            .assignments
            .iter()
            .any(|a| a.patient_id == patient_id && a.care_team_member_id == member_id)
        {
            return Err(RequestError::with_status(
                "Care team member already assigned to this patient",
                400,
            ));
        }
        let member = state
            .members
            .iter()
            .find(|m| m.id == member_id)
            .cloned()
            .ok_or_else(|| not_found("Care team member"))?;
        state.next_id += 1;
        let assignment = CareTeamAssignment {
            id: state.next_id,
            patient_id,
            care_team_member_id: member_id,
            assigned_date: date("2024-06-01"),
            care_team_member: member,
        };
        state.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn unassign_care_team_member(
        &self,
        patient_id: RecordId,
        assignment_id: RecordId,
    ) -> Result<(), RequestError> {
        let mut state = self.enter("unassign_care_team_member")?;
        let before = state.assignments.len();
        state
            .assignments
            .retain(|a| !(a.id == assignment_id && a.patient_id == patient_id));
        if state.assignments.len() == before {
            return Err(not_found("Assignment"));
        }
        Ok(())
    }

    async fn list_screenings(
        &self,
        patient_id: RecordId,
    ) -> Result<Vec<HealthScreening>, RequestError> {
        let state = self.enter("list_screenings")?;
        let mut rows: Vec<HealthScreening> = state
            .screenings
            .iter()
            .filter(|s| s.patient_id == patient_id)
            .cloned()
            .collect();
        // Newest first, like the real endpoint.
        rows.sort_by(|a, b| b.screening_date.cmp(&a.screening_date));
        Ok(rows)
    }

    async fn get_screening(
        &self,
        screening_id: RecordId,
    ) -> Result<HealthScreening, RequestError> {
        let state = self.enter("get_screening")?;
        state
            .screenings
            .iter()
            .find(|s| s.id == screening_id)
            .cloned()
            .ok_or_else(|| not_found("Health screening"))
    }
}

/// Answers confirmations from a script and records every notification.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<bool>,
    pub questions: Vec<String>,
    pub notices: Vec<String>,
}

impl ScriptedPrompt {
    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            ..Self::default()
        }
    }
}

impl UserPrompt for ScriptedPrompt {
    fn confirm(&mut self, question: &str) -> bool {
        self.questions.push(question.to_string());
        self.answers.pop_front().unwrap_or(false)
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

pub fn fallback(operation: Operation) -> RequestError {
    RequestError::new(operation.fallback_message())
}
