//! Paginated, searchable, filterable patient list.

use caredash_api::{CareApi, PatientFilter, PatientPage, PatientQuery};
use caredash_core::{DashboardConfig, Patient, PatientStatus, RecordId, RequestError};
use tracing::{debug, info};

use crate::{ActionOutcome, UserPrompt};

const DELETE_QUESTION: &str = "Are you sure you want to delete this patient?";

/// Rows and total from one reload. Replaced as a whole, never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListViewState {
    pub patients: Vec<Patient>,
    pub total: u64,
}

/// A reload in flight: the query it was issued with and the generation it
/// belongs to. Only the newest ticket may write its result back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTicket {
    generation: u64,
    query: PatientQuery,
}

impl ListTicket {
    pub fn query(&self) -> &PatientQuery {
        &self.query
    }
}

pub struct ListViewController<A> {
    api: A,
    page_size: u32,
    search: String,
    status_filter: Option<PatientStatus>,
    page: u32,
    view: ListViewState,
    loading: bool,
    error: Option<String>,
    deleting: Option<RecordId>,
    generation: u64,
}

impl<A: CareApi> ListViewController<A> {
    pub fn new(api: A, config: &DashboardConfig) -> Self {
        Self {
            api,
            page_size: config.page_size.max(1),
            search: String::new(),
            status_filter: None,
            page: 1,
            view: ListViewState::default(),
            loading: false,
            error: None,
            deleting: None,
            generation: 0,
        }
    }

    /// Start from the given search text and status filter on page 1.
    /// Nothing is fetched until the first reload.
    pub fn with_filters(
        mut self,
        search: impl Into<String>,
        status: Option<PatientStatus>,
    ) -> Self {
        self.search = search.into();
        self.status_filter = status;
        self.page = 1;
        self
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn status_filter(&self) -> Option<PatientStatus> {
        self.status_filter
    }

    /// Current 1-based page.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn view(&self) -> &ListViewState {
        &self.view
    }

    pub fn patients(&self) -> &[Patient] {
        &self.view.patients
    }

    pub fn total(&self) -> u64 {
        self.view.total
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message from the last failed reload, shown inline.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn deleting(&self) -> Option<RecordId> {
        self.deleting
    }

    pub fn total_pages(&self) -> u32 {
        let pages = self.view.total.div_ceil(u64::from(self.page_size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn current_query(&self) -> PatientQuery {
        PatientQuery::for_page(
            self.page,
            self.page_size,
            PatientFilter::new(&self.search, self.status_filter),
        )
    }

    /// Start a reload for the current parameters. Any ticket handed out
    /// earlier becomes stale.
    pub fn begin_reload(&mut self) -> ListTicket {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        ListTicket {
            generation: self.generation,
            query: self.current_query(),
        }
    }

    /// Apply the response for `ticket`. Returns `false` when the ticket was
    /// superseded and the response was dropped.
    pub fn finish_reload(
        &mut self,
        ticket: ListTicket,
        result: Result<PatientPage, RequestError>,
    ) -> bool {
        if ticket.generation != self.generation {
            debug!(
                stale = ticket.generation,
                current = self.generation,
                "dropping superseded patient list response"
            );
            return false;
        }

        match result {
            Ok(page) => {
                self.view = ListViewState {
                    patients: page.patients,
                    total: page.total,
                };
            }
            Err(err) => {
                self.error = Some(err.message);
            }
        }
        self.loading = false;
        true
    }

    /// Change the search text. Resets to page 1.
    pub fn search_changed(&mut self, text: impl Into<String>) -> ListTicket {
        self.search = text.into();
        self.page = 1;
        self.begin_reload()
    }

    /// Change the status filter. Resets to page 1.
    pub fn status_changed(&mut self, status: Option<PatientStatus>) -> ListTicket {
        self.status_filter = status;
        self.page = 1;
        self.begin_reload()
    }

    /// Move to `page`, clamped to the known page range. `None` when the
    /// clamped page is the current one.
    pub fn page_changed(&mut self, page: u32) -> Option<ListTicket> {
        let clamped = page.clamp(1, self.total_pages().max(1));
        if clamped == self.page {
            return None;
        }
        self.page = clamped;
        Some(self.begin_reload())
    }

    pub async fn reload(&mut self) {
        let ticket = self.begin_reload();
        self.run(ticket).await;
    }

    pub async fn set_search(&mut self, text: impl Into<String>) {
        let ticket = self.search_changed(text);
        self.run(ticket).await;
    }

    pub async fn set_status_filter(&mut self, status: Option<PatientStatus>) {
        let ticket = self.status_changed(status);
        self.run(ticket).await;
    }

    pub async fn go_to_page(&mut self, page: u32) {
        if let Some(ticket) = self.page_changed(page) {
            self.run(ticket).await;
        }
    }

    pub async fn next_page(&mut self) {
        if self.has_next() {
            self.go_to_page(self.page + 1).await;
        }
    }

    pub async fn previous_page(&mut self) {
        if self.has_previous() {
            self.go_to_page(self.page - 1).await;
        }
    }

    /// Delete after confirmation, then reload the current page. When the
    /// deleted row was the only one on the last page, step back to the new
    /// last page.
    pub async fn delete_patient<P: UserPrompt + ?Sized>(
        &mut self,
        id: RecordId,
        prompt: &mut P,
    ) -> ActionOutcome {
        if !prompt.confirm(DELETE_QUESTION) {
            return ActionOutcome::Declined;
        }

        self.deleting = Some(id);
        if let Err(err) = self.api.delete_patient(id).await {
            self.deleting = None;
            prompt.notify(&err.message);
            return ActionOutcome::Failed(err.message);
        }
        info!(patient_id = id, "patient deleted");

        self.reload().await;
        if self.page_past_end() {
            self.page = self.total_pages().max(1);
            self.reload().await;
        }
        self.deleting = None;
        ActionOutcome::Completed
    }

    fn page_past_end(&self) -> bool {
        self.error.is_none()
            && self.view.patients.is_empty()
            && self.page > 1
            && self.page > self.total_pages()
    }

    async fn run(&mut self, ticket: ListTicket) {
        let result = self.api.patient_page(ticket.query()).await;
        self.finish_reload(ticket, result);
    }
}
