use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use caredash_api::{ApiConfig, CareApi, HttpCareApi, DEFAULT_BASE_URL};
use caredash_core::{CareTeamRole, DashboardConfig, PatientDraft, PatientStatus, RecordId};
use caredash_views::{
    ActionOutcome, DetailViewController, ListViewController, PatientRef, UserPrompt,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "caredash", about = "Patient care dashboard from the terminal.")]
struct Cli {
    /// API base URL.
    #[arg(long, env = "CAREDASH_API_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Answer "yes" to every confirmation.
    #[arg(short, long, global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List patients, one page at a time
    List {
        /// Match name, email or phone
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(long)]
        status: Option<PatientStatus>,
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Show a patient with care team and screening trend
    Show { id: RecordId },
    /// Create a patient
    Create(PatientFields),
    /// Edit fields of an existing patient
    Edit {
        id: RecordId,
        #[command(flatten)]
        fields: PatientFields,
    },
    /// Delete a patient
    Delete {
        id: RecordId,
        /// Page the patient is listed on
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List care team members
    Members {
        /// health-coach, bhcm or psychiatrist
        #[arg(long)]
        role: Option<CareTeamRole>,
    },
    /// Assign a care team member to a patient
    Assign { patient: RecordId, member: RecordId },
    /// Remove a care team assignment (by assignment id)
    Unassign {
        patient: RecordId,
        assignment: RecordId,
    },
}

#[derive(Args, Debug, Default)]
struct PatientFields {
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: Option<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    dob: Option<NaiveDate>,
    /// YYYY-MM-DD, defaults to today on create
    #[arg(long)]
    enrolled: Option<NaiveDate>,
    #[arg(long)]
    status: Option<PatientStatus>,
    #[arg(long)]
    program: Option<String>,
}

impl PatientFields {
    fn apply(self, draft: &mut PatientDraft) {
        if let Some(value) = self.first_name {
            draft.first_name = value;
        }
        if let Some(value) = self.last_name {
            draft.last_name = value;
        }
        if let Some(value) = self.email {
            draft.email = value;
        }
        if let Some(value) = self.phone {
            draft.phone = value;
        }
        if let Some(value) = self.address {
            draft.address = value;
        }
        if let Some(value) = self.dob {
            draft.date_of_birth = Some(value);
        }
        if let Some(value) = self.enrolled {
            draft.enrollment_date = Some(value);
        }
        if let Some(value) = self.status {
            draft.status = value;
        }
        if let Some(value) = self.program {
            draft.care_program = value;
        }
    }
}

struct TerminalPrompt {
    assume_yes: bool,
}

impl UserPrompt for TerminalPrompt {
    fn confirm(&mut self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{question} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }

    fn notify(&mut self, message: &str) {
        eprintln!("error: {message}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("caredash=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let mut api_config = ApiConfig::new(&cli.base_url)?;
    if let Some(secs) = cli.timeout_secs {
        api_config = api_config.with_timeout(Duration::from_secs(secs));
    }
    tracing::debug!(base_url = api_config.base_url(), "using care dashboard API");
    let api = HttpCareApi::new(api_config).context("Could not build the API client")?;
    let config = DashboardConfig::default();
    let mut prompt = TerminalPrompt {
        assume_yes: cli.yes,
    };

    let outcome = match cli.command {
        Command::List {
            search,
            status,
            page,
        } => {
            let mut list = ListViewController::new(api, &config).with_filters(search, status);
            // The requested page can only be clamped once the total is known.
            list.reload().await;
            list.go_to_page(page).await;
            print_list(&list)?;
            ActionOutcome::Completed
        }
        Command::Show { id } => {
            let mut view = DetailViewController::open(api, PatientRef::Existing(id), config);
            view.enter().await;
            print_detail(&view)?;
            ActionOutcome::Completed
        }
        Command::Create(fields) => {
            let mut view = DetailViewController::open(api, PatientRef::New, config);
            view.enter().await;
            if let Some(draft) = view.draft_mut() {
                fields.apply(draft);
            }
            let outcome = view.save(&mut prompt).await;
            if outcome.is_completed() {
                println!("Created patient {}", view.identity());
                print_detail(&view)?;
            }
            outcome
        }
        Command::Edit { id, fields } => {
            let mut view = DetailViewController::open(api, PatientRef::Existing(id), config);
            view.enter().await;
            if let Some(err) = view.error() {
                bail!("{err}");
            }
            view.begin_edit();
            if let Some(draft) = view.draft_mut() {
                fields.apply(draft);
            }
            let outcome = view.save(&mut prompt).await;
            if outcome.is_completed() {
                print_detail(&view)?;
            }
            outcome
        }
        Command::Delete { id, page } => {
            let mut list = ListViewController::new(api, &config);
            list.reload().await;
            list.go_to_page(page).await;
            let outcome = list.delete_patient(id, &mut prompt).await;
            if outcome.is_completed() {
                print_list(&list)?;
            }
            outcome
        }
        Command::Members { role } => {
            let members = api.list_care_team_members(role).await?;
            for member in members {
                println!(
                    "{:>5}  {:<28} {:<32} {}",
                    member.id,
                    member.full_name(),
                    member.role,
                    member.email
                );
            }
            ActionOutcome::Completed
        }
        Command::Assign { patient, member } => {
            let mut view = DetailViewController::open(api, PatientRef::Existing(patient), config);
            view.enter().await;
            if let Some(err) = view.error() {
                bail!("{err}");
            }
            view.open_assign_picker();
            if !view.select_candidate(member) {
                bail!("Care team member {member} is unknown or already assigned to this patient");
            }
            let outcome = view.confirm_assignment(&mut prompt).await;
            if outcome.is_completed() {
                print_detail(&view)?;
            }
            outcome
        }
        Command::Unassign {
            patient,
            assignment,
        } => {
            let mut view = DetailViewController::open(api, PatientRef::Existing(patient), config);
            view.enter().await;
            if let Some(err) = view.error() {
                bail!("{err}");
            }
            view.unassign(assignment, &mut prompt).await
        }
    };

    Ok(match outcome {
        ActionOutcome::Failed(_) => ExitCode::FAILURE,
        ActionOutcome::Declined => {
            println!("Cancelled.");
            ExitCode::SUCCESS
        }
        ActionOutcome::Completed | ActionOutcome::Skipped => ExitCode::SUCCESS,
    })
}

fn print_list<A: CareApi>(list: &ListViewController<A>) -> anyhow::Result<()> {
    if let Some(err) = list.error() {
        bail!("{err}");
    }
    if list.patients().is_empty() {
        println!("No patients found");
        return Ok(());
    }

    for patient in list.patients() {
        println!(
            "{:>5}  {:<28} {:<32} {:<12} {:<11} {}",
            patient.id,
            patient.full_name(),
            patient.email,
            patient.phone.as_deref().unwrap_or("-"),
            patient.status,
            patient.enrollment_date
        );
    }
    println!(
        "Page {} of {} ({} total)",
        list.page(),
        list.total_pages(),
        list.total()
    );
    Ok(())
}

fn print_detail<A: CareApi>(view: &DetailViewController<A>) -> anyhow::Result<()> {
    if let Some(err) = view.error() {
        bail!("{err}");
    }
    let Some(patient) = view.patient() else {
        bail!("Patient {} is not loaded", view.identity());
    };

    println!("{} (#{}, {})", patient.full_name(), patient.id, patient.status);
    println!("  Email:          {}", patient.email);
    println!("  Phone:          {}", patient.phone.as_deref().unwrap_or("-"));
    println!("  Address:        {}", patient.address.as_deref().unwrap_or("-"));
    println!("  Date of birth:  {}", patient.date_of_birth);
    println!("  Enrolled:       {}", patient.enrollment_date);
    println!(
        "  Care program:   {}",
        patient.care_program.as_deref().unwrap_or("-")
    );

    println!("\nCare team");
    if view.assignments().is_empty() {
        println!("  No care team members assigned");
    }
    for assignment in view.assignments() {
        println!(
            "  [{}] {} ({}), assigned {}",
            assignment.id,
            assignment.care_team_member.full_name(),
            assignment.care_team_member.role,
            assignment.assigned_date
        );
    }

    println!("\nHealth screenings");
    if view.screenings().is_empty() {
        println!("  No health screenings recorded");
        return Ok(());
    }
    let summary = view.screening_summary();
    println!(
        "  Average score: {}   Trend: {}   Total screenings: {}",
        summary.average_label(),
        summary.trend,
        summary.total
    );
    for screening in view.screenings() {
        println!(
            "  {}  {:>4.1}  {:?}",
            screening.screening_date,
            screening.score,
            screening.severity()
        );
    }
    println!("  Lower scores indicate improvement (range 0-10).");
    Ok(())
}
