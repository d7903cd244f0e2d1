//! Single-patient view: create, view and edit modes, care-team assignment,
//! and screening history.

use std::collections::HashSet;

use caredash_api::CareApi;
use caredash_core::{
    summarize_screenings, CareTeamAssignment, CareTeamMember, DashboardConfig, HealthScreening,
    Patient, PatientDraft, RecordId, ScreeningSummary,
};
use chrono::Utc;
use tracing::{info, warn};

use crate::{ActionOutcome, PatientRef, UserPrompt};

const UNASSIGN_QUESTION: &str = "Are you sure you want to unassign this care team member?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailMode {
    /// Blank draft for a patient that does not exist yet.
    Create,
    View,
    Edit,
}

/// Members from `directory` that hold no assignment in `assignments`.
pub fn unassigned_members<'a>(
    directory: &'a [CareTeamMember],
    assignments: &[CareTeamAssignment],
) -> Vec<&'a CareTeamMember> {
    let assigned: HashSet<RecordId> = assignments
        .iter()
        .map(|assignment| assignment.care_team_member_id)
        .collect();
    directory
        .iter()
        .filter(|member| !assigned.contains(&member.id))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AssignPicker {
    selected: Option<RecordId>,
}

pub struct DetailViewController<A> {
    api: A,
    config: DashboardConfig,
    identity: PatientRef,
    mode: DetailMode,
    patient: Option<Patient>,
    draft: Option<PatientDraft>,
    assignments: Vec<CareTeamAssignment>,
    screenings: Vec<HealthScreening>,
    directory: Vec<CareTeamMember>,
    picker: Option<AssignPicker>,
    loading: bool,
    saving: bool,
    error: Option<String>,
}

impl<A: CareApi> DetailViewController<A> {
    /// Controller for `identity`. Nothing is fetched until [`Self::enter`].
    pub fn open(api: A, identity: PatientRef, config: DashboardConfig) -> Self {
        let (mode, draft) = match identity {
            PatientRef::New => (
                DetailMode::Create,
                Some(PatientDraft::blank(Utc::now().date_naive())),
            ),
            PatientRef::Existing(_) => (DetailMode::View, None),
        };

        Self {
            api,
            config,
            identity,
            mode,
            patient: None,
            draft,
            assignments: Vec::new(),
            screenings: Vec::new(),
            directory: Vec::new(),
            picker: None,
            loading: matches!(identity, PatientRef::Existing(_)),
            saving: false,
            error: None,
        }
    }

    pub fn identity(&self) -> PatientRef {
        self.identity
    }

    pub fn mode(&self) -> DetailMode {
        self.mode
    }

    /// Canonical copy: the last patient record fetched from the server.
    pub fn patient(&self) -> Option<&Patient> {
        self.patient.as_ref()
    }

    pub fn draft(&self) -> Option<&PatientDraft> {
        self.draft.as_ref()
    }

    /// Editable draft in create and edit mode.
    pub fn draft_mut(&mut self) -> Option<&mut PatientDraft> {
        self.draft.as_mut()
    }

    pub fn assignments(&self) -> &[CareTeamAssignment] {
        &self.assignments
    }

    pub fn screenings(&self) -> &[HealthScreening] {
        &self.screenings
    }

    pub fn care_team_directory(&self) -> &[CareTeamMember] {
        &self.directory
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Load failure, shown inline. Action failures never land here.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn screening_summary(&self) -> ScreeningSummary {
        summarize_screenings(&self.screenings, &self.config)
    }

    /// First load: the care-team directory, then the patient's records
    /// unless this is a new patient.
    pub async fn enter(&mut self) {
        self.load_directory().await;
        self.load().await;
    }

    /// Fetch patient, assignments and screenings together. Any single
    /// failure becomes the view's error and nothing is replaced.
    pub async fn load(&mut self) {
        let PatientRef::Existing(id) = self.identity else {
            self.loading = false;
            return;
        };

        self.loading = true;
        self.error = None;
        let result = futures::try_join!(
            self.api.get_patient(id),
            self.api.list_assignments(id),
            self.api.list_screenings(id)
        );

        match result {
            Ok((detail, assignments, screenings)) => {
                self.patient = Some(detail.patient);
                self.assignments = assignments;
                self.screenings = screenings;
            }
            Err(err) => {
                warn!(patient_id = id, message = %err.message, "patient load failed");
                self.error = Some(err.message);
            }
        }
        self.loading = false;
    }

    async fn load_directory(&mut self) {
        match self.api.list_care_team_members(None).await {
            Ok(members) => self.directory = members,
            Err(err) => warn!(message = %err.message, "care team directory unavailable"),
        }
    }

    /// Snapshot the canonical copy into a draft. Only from view mode.
    pub fn begin_edit(&mut self) -> bool {
        if self.mode != DetailMode::View {
            return false;
        }
        let Some(patient) = self.patient.as_ref() else {
            return false;
        };
        self.draft = Some(PatientDraft::from(patient));
        self.mode = DetailMode::Edit;
        true
    }

    /// Drop the draft and re-read the server copy. Only from edit mode.
    pub async fn cancel_edit(&mut self) -> bool {
        if self.mode != DetailMode::Edit {
            return false;
        }
        self.draft = None;
        self.mode = DetailMode::View;
        self.load().await;
        true
    }

    /// Create or update from the draft. On success the view switches to
    /// view mode for the saved record and reloads everything; on failure
    /// the draft stays as the user left it.
    pub async fn save<P: UserPrompt + ?Sized>(&mut self, prompt: &mut P) -> ActionOutcome {
        if !matches!(self.mode, DetailMode::Create | DetailMode::Edit) {
            return ActionOutcome::Skipped;
        }
        let Some(draft) = self.draft.as_ref() else {
            return ActionOutcome::Skipped;
        };
        let payload = match draft.to_payload() {
            Ok(payload) => payload,
            Err(err) => {
                let message = err.to_string();
                prompt.notify(&message);
                return ActionOutcome::Failed(message);
            }
        };

        self.saving = true;
        let result = match self.identity {
            PatientRef::New => self.api.create_patient(&payload).await,
            PatientRef::Existing(id) => self.api.update_patient(id, &payload).await,
        };
        self.saving = false;

        match result {
            Ok(saved) => {
                if self.identity == PatientRef::New {
                    info!(patient_id = saved.id, "patient created");
                }
                self.identity = PatientRef::Existing(saved.id);
                self.mode = DetailMode::View;
                self.draft = None;
                self.load().await;
                ActionOutcome::Completed
            }
            Err(err) => {
                prompt.notify(&err.message);
                ActionOutcome::Failed(err.message)
            }
        }
    }

    /// Directory members not yet on this patient's care team.
    pub fn assignment_candidates(&self) -> Vec<&CareTeamMember> {
        unassigned_members(&self.directory, &self.assignments)
    }

    pub fn open_assign_picker(&mut self) -> bool {
        if self.identity == PatientRef::New {
            return false;
        }
        self.picker = Some(AssignPicker::default());
        true
    }

    pub fn close_assign_picker(&mut self) {
        self.picker = None;
    }

    pub fn is_assign_picker_open(&self) -> bool {
        self.picker.is_some()
    }

    pub fn selected_candidate(&self) -> Option<RecordId> {
        self.picker.as_ref().and_then(|picker| picker.selected)
    }

    /// Select a member in the open picker. Members already assigned are
    /// refused.
    pub fn select_candidate(&mut self, member_id: RecordId) -> bool {
        let allowed = self
            .assignment_candidates()
            .iter()
            .any(|member| member.id == member_id);
        match self.picker.as_mut() {
            Some(picker) if allowed => {
                picker.selected = Some(member_id);
                true
            }
            _ => false,
        }
    }

    /// Assign the selected member, then reload. The picker stays open when
    /// the call fails.
    pub async fn confirm_assignment<P: UserPrompt + ?Sized>(
        &mut self,
        prompt: &mut P,
    ) -> ActionOutcome {
        let (Some(patient_id), Some(member_id)) = (self.identity.id(), self.selected_candidate())
        else {
            return ActionOutcome::Skipped;
        };

        match self.api.assign_care_team_member(patient_id, member_id).await {
            Ok(assignment) => {
                info!(
                    patient_id,
                    member_id,
                    assignment_id = assignment.id,
                    "care team member assigned"
                );
                self.picker = None;
                self.load().await;
                ActionOutcome::Completed
            }
            Err(err) => {
                prompt.notify(&err.message);
                ActionOutcome::Failed(err.message)
            }
        }
    }

    /// Remove an assignment by its own id after confirmation, then reload.
    pub async fn unassign<P: UserPrompt + ?Sized>(
        &mut self,
        assignment_id: RecordId,
        prompt: &mut P,
    ) -> ActionOutcome {
        let Some(patient_id) = self.identity.id() else {
            return ActionOutcome::Skipped;
        };
        if !prompt.confirm(UNASSIGN_QUESTION) {
            return ActionOutcome::Declined;
        }

        match self
            .api
            .unassign_care_team_member(patient_id, assignment_id)
            .await
        {
            Ok(()) => {
                info!(patient_id, assignment_id, "care team member unassigned");
                self.load().await;
                ActionOutcome::Completed
            }
            Err(err) => {
                prompt.notify(&err.message);
                ActionOutcome::Failed(err.message)
            }
        }
    }
}
