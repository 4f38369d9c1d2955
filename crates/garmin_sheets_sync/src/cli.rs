//! Command-line surface. Anything not given as a flag is asked for
//! interactively.

use crate::config::Settings;
use crate::date_range::{DATE_FORMAT, DateRange, parse_date};
use crate::error::{SyncError, SyncResult};
use crate::google_auth::GoogleAuthorizer;
use crate::profile::{Profile, Profiles};
use crate::prompt::Prompter;
use crate::sinks::OutputType;
use crate::sync::{self, SyncRequest};
use chrono::{NaiveDate, TimeDelta};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "garmin-sheets-sync",
    version,
    about = "Export daily Garmin Connect health metrics to Google Sheets or CSV"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch metrics for a date range and write them out (the default).
    #[command(alias = "cli-sync")]
    Sync(SyncArgs),
    /// Authorize Google Sheets access and cache the token.
    Auth,
    /// List the profiles found in the environment.
    Profiles,
}

#[derive(Debug, Default, Args)]
pub struct SyncArgs {
    /// First day to export, YYYY-MM-DD.
    #[arg(long)]
    pub start_date: Option<String>,
    /// Last day to export (inclusive), YYYY-MM-DD.
    #[arg(long)]
    pub end_date: Option<String>,
    /// Profile to use, e.g. USER1.
    #[arg(long)]
    pub profile: Option<String>,
    #[arg(long, value_enum)]
    pub output_type: Option<OutputType>,
    /// Overwrite existing rows or files without asking.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl SyncArgs {
    /// Fill in whatever was not passed on the command line. Dates are
    /// validated here, before anything touches the network.
    pub async fn resolve(
        self,
        profiles: &Profiles,
        prompter: &mut dyn Prompter,
        today: NaiveDate,
    ) -> SyncResult<SyncRequest> {
        let profile = match self.profile {
            Some(name) => profiles.get(&name)?,
            None => choose_profile(profiles, prompter).await?,
        };

        let end_default = today - TimeDelta::days(1);
        let start = match self.start_date {
            Some(raw) => parse_date(&raw)?,
            None => ask_date(prompter, "Start date", end_default - TimeDelta::days(6)).await?,
        };
        let end = match self.end_date {
            Some(raw) => parse_date(&raw)?,
            None => ask_date(prompter, "End date", end_default.max(start)).await?,
        };
        let range = DateRange::new(start, end)?;

        let output = match self.output_type {
            Some(output) => output,
            None => choose_output(profile, prompter).await?,
        };

        Ok(SyncRequest {
            profile: profile.name.clone(),
            range,
            output,
            assume_yes: self.yes,
        })
    }
}

async fn choose_profile<'a>(
    profiles: &'a Profiles,
    prompter: &mut dyn Prompter,
) -> SyncResult<&'a Profile> {
    match profiles.len() {
        0 => Err(SyncError::Config(
            "no profiles configured; set USER1_GARMIN_EMAIL and USER1_GARMIN_PASSWORD".into(),
        )),
        1 => profiles.get(&profiles.names()[0]),
        _ => {
            let names = profiles.names();
            let index = prompter.select("Select a profile", &names, 0).await?;
            profiles.get(&names[index])
        }
    }
}

async fn ask_date(
    prompter: &mut dyn Prompter,
    label: &str,
    default: NaiveDate,
) -> SyncResult<NaiveDate> {
    let default = default.format(DATE_FORMAT).to_string();
    let message = format!("{label} (YYYY-MM-DD)");
    loop {
        let answer = prompter.input(&message, Some(&default)).await?;
        match parse_date(&answer) {
            Ok(date) => return Ok(date),
            Err(e) => println!("{e}"),
        }
    }
}

async fn choose_output(profile: &Profile, prompter: &mut dyn Prompter) -> SyncResult<OutputType> {
    let options: Vec<String> = OutputType::ALL.iter().map(|o| o.to_string()).collect();
    let default = if profile.sheet_id.is_some() {
        OutputType::Sheets
    } else {
        OutputType::Csv
    };
    let default_index = OutputType::ALL
        .iter()
        .position(|o| *o == default)
        .unwrap_or(0);
    let index = prompter
        .select("Select output type", &options, default_index)
        .await?;
    Ok(OutputType::ALL[index])
}

/// Run one parsed command. No subcommand means an interactive sync.
pub async fn run_command(
    command: Option<Command>,
    settings: &Settings,
    profiles: &Profiles,
    prompter: &mut dyn Prompter,
) -> SyncResult<()> {
    match command.unwrap_or_else(|| Command::Sync(SyncArgs::default())) {
        Command::Sync(args) => {
            let today = chrono::Local::now().date_naive();
            let request = args.resolve(profiles, prompter, today).await?;
            let report = sync::run_sync(settings, profiles, &request, prompter).await?;
            println!(
                "Sync complete for {} ({} to {}): {report}.",
                request.profile,
                request.range.start(),
                request.range.end()
            );
        }
        Command::Auth => {
            let authorizer =
                GoogleAuthorizer::new(&settings.client_secret_path, &settings.google_token_path);
            authorizer.authorize().await?;
            println!(
                "Google authorization saved to {}.",
                authorizer.token_path().display()
            );
        }
        Command::Profiles => {
            if profiles.is_empty() {
                println!("No profiles configured.");
            }
            for profile in profiles.iter() {
                let email = profile.email.as_deref().unwrap_or("(no email)");
                let csv = profile
                    .csv_path
                    .clone()
                    .unwrap_or_else(|| settings.default_csv_path(&profile.name));
                println!(
                    "{}: {email}, sheet '{}' in {}, csv {}",
                    profile.name,
                    profile.sheet_name(),
                    profile.spreadsheet_label(),
                    csv.display()
                );
            }
        }
    }
    Ok(())
}
