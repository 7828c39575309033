use crate::infra::{in_memory_roster, parse_date, seed_roster};
use chrono::{Local, NaiveDate};
use clap::Args;
use fleet_roster::config::{AppConfig, SettingsConfig};
use fleet_roster::error::AppError;
use fleet_roster::roster::registration::{AuthRegistrationSubmitter, Role};
use fleet_roster::roster::validation::{format_cpf, validate_cpf};
use fleet_roster::roster::{
    display_score, AuthGateway, Credentials, DraftStore, FileDraftStore, FontSize,
    InMemoryDraftStore, PerformanceReport, RegistrationStage, RegistrationWizard, RosterState,
    SaveOutcome, ScoreEntry, SettingsPatch, Theme, UserRegistrationData,
};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct CpfArgs {
    /// CPF with or without punctuation
    pub(crate) value: String,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ReportArgs {
    /// Any day of the month to report on (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) month: Option<NaiveDate>,
    /// Write the CSV to this file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the reporting date (defaults to today).
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Directory for the registration draft (defaults to APP_DRAFT_DIR).
    #[arg(long)]
    pub(crate) draft_dir: Option<PathBuf>,
    /// Keep the registration draft in memory instead of on disk.
    #[arg(long)]
    pub(crate) ephemeral_drafts: bool,
    /// Skip the operator registration portion of the demo.
    #[arg(long)]
    pub(crate) skip_registration: bool,
}

pub(crate) fn run_cpf_check(args: CpfArgs) {
    match validate_cpf(&args.value) {
        Ok(digits) => println!("{} is valid ({digits})", format_cpf(&digits)),
        Err(err) => println!("{} is not valid: {err}", format_cpf(&args.value)),
    }
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let today = Local::now().date_naive();
    let state = in_memory_roster(&SettingsConfig::default());
    seed_roster(&state, today).await?;

    let report = state
        .reports
        .performance(args.month.unwrap_or(today))
        .await?;
    match args.output {
        Some(path) => {
            report.write_csv(File::create(&path)?)?;
            println!(
                "Wrote {} drivers for {} to {}",
                report.rows.len(),
                report.month.format("%Y-%m"),
                path.display()
            );
        }
        None => report.write_csv(io::stdout().lock())?,
    }
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        draft_dir,
        ephemeral_drafts,
        skip_registration,
    } = args;

    let config = AppConfig::load()?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let state = in_memory_roster(&config.settings);

    println!("Fleet roster demo ({})", today.format("%d/%m/%Y"));

    if !skip_registration {
        let drafts: Arc<dyn DraftStore> = if ephemeral_drafts {
            Arc::new(InMemoryDraftStore::default())
        } else {
            let dir = draft_dir.unwrap_or_else(|| config.registration.draft_dir.clone());
            println!("Registration drafts stored under {}", dir.display());
            Arc::new(FileDraftStore::new(dir))
        };
        demo_registration(&state, drafts).await;
    }

    let seeded = seed_roster(&state, today).await?;
    println!("\nRoster ({} drivers)", seeded.drivers.len());
    for driver in &seeded.drivers {
        println!(
            "- {} | CPF {} | admitted {} | {}",
            driver.name,
            format_cpf(&driver.cpf),
            driver.admitted_on.format("%d/%m/%Y"),
            driver.status.label()
        );
    }

    println!("\nEvaluation items (heaviest first)");
    for item in state.evaluations.list_items().await? {
        println!(
            "- {} (weight {}){}",
            item.name,
            item.weight.get(),
            item.description
                .map(|text| format!(": {text}"))
                .unwrap_or_default()
        );
    }

    println!("\nScorecards");
    for driver in &seeded.drivers {
        let card = state.evaluations.scorecard(&driver.id).await?;
        println!("- {}: overall {}", driver.name, display_score(card.overall));
        for entry in &card.items {
            println!(
                "    {} {:.1} ({} evaluation{})",
                entry.name,
                entry.average,
                entry.samples,
                if entry.samples == 1 { "" } else { "s" }
            );
        }
    }

    if let Some(driver) = seeded.drivers.last() {
        let mut changes = state.evaluations.feed().subscribe(driver.id.clone());
        let entries = seeded
            .items
            .iter()
            .map(|item| ScoreEntry {
                item_id: item.id.clone(),
                score: "8".to_string(),
                notes: Some("first review".to_string()),
            })
            .collect();
        match state.evaluations.submit(&driver.id, entries).await {
            Ok(_) => {
                if let Some(change) = changes.next().await {
                    println!(
                        "\nLive update: {} new scores for {}",
                        change.inserted, driver.name
                    );
                }
            }
            Err(err) => println!("\nEvaluation rejected: {err}"),
        }

        for (score, comments) in [("7,5", "adapting to routes"), ("8", "steady progress")] {
            let upsert = state
                .ratings
                .upsert(&driver.id, score, comments, today)
                .await?;
            println!(
                "Monthly rating for {} {} -> {:.1}",
                driver.name,
                if upsert.created { "recorded" } else { "updated" },
                upsert.rating.score
            );
        }
    }

    let report = state.reports.performance(today).await?;
    render_report(&report);

    demo_settings(&state).await;
    Ok(())
}

fn render_report(report: &PerformanceReport) {
    println!("\nPerformance report {}", report.month.format("%m/%Y"));
    println!(
        "- {} of {} drivers evaluated | average overall {}",
        report.evaluated_drivers,
        report.rows.len(),
        display_score(report.average_overall)
    );
    for row in &report.rows {
        println!(
            "  {}. {} [{}] overall {} | monthly {} | {} evaluations",
            row.rank,
            row.name,
            row.status_label,
            display_score(row.overall),
            display_score(row.monthly_rating),
            row.evaluations
        );
    }
}

async fn demo_registration(state: &RosterState, drafts: Arc<dyn DraftStore>) {
    println!("\nOperator registration");
    let mut wizard = RegistrationWizard::mount(drafts);
    if wizard.stage() != RegistrationStage::BasicInfo {
        println!(
            "  Resuming saved draft at step {} ({})",
            wizard.stage().number(),
            wizard.stage().label()
        );
    }

    loop {
        let stage = wizard.stage();
        if let Err(err) = wizard.save_progress(|data| fill_stage(data, stage)) {
            println!("  Draft could not be saved: {err}");
            return;
        }
        if stage == RegistrationStage::Verification {
            break;
        }
        if let Err(err) = wizard.complete_stage().and_then(|()| wizard.next()) {
            println!("  Step {} incomplete: {err}", stage.number());
            return;
        }
        println!("  Step {} ({}) complete", stage.number(), stage.label());
    }

    let name = wizard.data().full_name();
    let email = wizard.data().email.clone();
    let password = wizard.data().password.clone();
    let role = wizard.data().role;
    let submitter = AuthRegistrationSubmitter::new(state.auth.clone(), state.users.repository());
    match wizard.submit(&submitter).await {
        Ok(user_id) => println!("  Registered {name} as {user_id} ({})", role.label()),
        Err(err) => {
            println!("  Registration rejected: {err}");
            return;
        }
    }

    match state.auth.sign_in(Credentials { email, password }).await {
        Ok(session) => println!("  Signed in as {}", session.email),
        Err(err) => println!("  Sign-in failed: {err}"),
    }
}

fn fill_stage(data: &mut UserRegistrationData, stage: RegistrationStage) {
    match stage {
        RegistrationStage::BasicInfo => {
            data.first_name = "Helena".to_string();
            data.last_name = "Martins".to_string();
            data.email = "helena.martins@frota.com.br".to_string();
            data.phone_number = "11 91234-5678".to_string();
            data.password = "frota-helena-01".to_string();
            data.password_confirmation = "frota-helena-01".to_string();
            data.security_question = "Primeiro veículo?".to_string();
            data.security_answer = "Fusca".to_string();
        }
        RegistrationStage::RoleSelection => {
            data.role = Role::Administrator;
            data.department = "Operações".to_string();
        }
        RegistrationStage::Permissions => {
            data.permissions.modules.reports = true;
        }
        RegistrationStage::Verification => {
            data.terms_accepted = true;
            data.privacy_accepted = true;
        }
    }
}

async fn demo_settings(state: &RosterState) {
    println!("\nOperator settings");
    let settings = &state.settings;
    if let Err(err) = settings.load().await {
        println!("  Settings unavailable: {err}");
        return;
    }
    let id = settings.subscribe(|current| {
        println!(
            "  observer: theme {:?}, font {:?}, contrast {}%",
            current.theme, current.font_size, current.contrast
        );
    });

    let patches = [
        SettingsPatch {
            theme: Some(Theme::Dark),
            ..SettingsPatch::default()
        },
        SettingsPatch {
            font_size: Some(FontSize::Large),
            ..SettingsPatch::default()
        },
        SettingsPatch {
            contrast: Some(70),
            ..SettingsPatch::default()
        },
    ];
    let mut tickets = Vec::with_capacity(patches.len());
    for patch in patches {
        match settings.update(patch) {
            Ok(ticket) => tickets.push(ticket),
            Err(err) => println!("  Change rejected: {err}"),
        }
    }
    println!("  {} changes queued, waiting for one write", tickets.len());
    if let Some(last) = tickets.pop() {
        match last.wait().await {
            SaveOutcome::Saved(_) => println!("  Saved"),
            SaveOutcome::Failed(err) => println!("  Save failed: {err}"),
            SaveOutcome::Cancelled => println!("  Save cancelled"),
        }
    }

    settings.unsubscribe(id);
    if let Err(err) = state.auth.sign_out().await {
        println!("  Sign-out failed: {err}");
    }
    settings.end_session();
    println!("  Signed out; settings back to defaults ({:?})", settings.current().theme);
}
