//! The sync pipeline: sign in, fetch every day of the range, write the sink.

use crate::config::Settings;
use crate::date_range::DateRange;
use crate::error::{SyncError, SyncResult};
use crate::fetcher::MetricFetcher;
use crate::google_auth::GoogleAuthorizer;
use crate::profile::{Profile, Profiles};
use crate::prompt::{AssumeYes, Prompter};
use crate::sinks::{CsvSink, OutputType, SheetsSink, Sink, SinkReport};
use garmin_connect_client::http_client::ReqwestGarminClient;
use garmin_connect_client::tokens::TokenStore;
use garmin_connect_client::{GarminClient, LoginOutcome};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// A fully resolved sync run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncRequest {
    pub profile: String,
    pub range: DateRange,
    pub output: OutputType,
    /// Skip overwrite confirmations.
    pub assume_yes: bool,
}

/// Run `request` end to end against the live services.
pub async fn run_sync(
    settings: &Settings,
    profiles: &Profiles,
    request: &SyncRequest,
    prompter: &mut dyn Prompter,
) -> SyncResult<SinkReport> {
    let profile = profiles.get(&request.profile)?;
    profile.credentials()?;
    check_destination(profile, request.output)?;

    let client = sign_in(settings, profile, prompter).await?;
    let sink = build_sink(settings, profile, request.output).await?;
    sync_records(
        client,
        &request.range,
        sink.as_ref(),
        prompter,
        request.assume_yes,
    )
    .await
}

/// Fetch every day of `range` and hand the records to `sink`.
pub async fn sync_records(
    client: Arc<dyn GarminClient>,
    range: &DateRange,
    sink: &dyn Sink,
    prompter: &mut dyn Prompter,
    assume_yes: bool,
) -> SyncResult<SinkReport> {
    let records = MetricFetcher::new(client).fetch_range(range).await?;
    if records.is_empty() {
        tracing::warn!("No metrics fetched. Nothing to write.");
        return Ok(SinkReport::default());
    }

    tracing::info!("Writing {} day(s) to {}", records.len(), sink.describe());
    let report = if assume_yes {
        sink.write(&records, &mut AssumeYes::new(prompter)).await?
    } else {
        sink.write(&records, prompter).await?
    };
    tracing::info!("{} sync completed: {report}", sink.describe());
    Ok(report)
}

/// Fail before any network traffic when the destination is not configured.
pub fn check_destination(profile: &Profile, output: OutputType) -> SyncResult<()> {
    if output == OutputType::Sheets && profile.sheet_id.is_none() {
        return Err(SyncError::Config(format!(
            "no {}_SHEET_ID configured; set it or use --output-type csv",
            profile.name
        )));
    }
    Ok(())
}

/// Resume the cached Garmin session for `profile`, or sign in (asking for an
/// MFA code when the account requires one).
pub async fn sign_in(
    settings: &Settings,
    profile: &Profile,
    prompter: &mut dyn Prompter,
) -> SyncResult<Arc<dyn GarminClient>> {
    let (email, password) = profile.credentials()?;
    let store = TokenStore::for_profile(&settings.garmin_token_dir, &profile.name);
    let client = ReqwestGarminClient::new(
        settings.garmin.clone(),
        email,
        SecretString::new(password.expose_secret().to_owned().into()),
    )?
    .with_token_store(store);

    if !client.restore_session().await? {
        tracing::info!(profile = %profile.name, "signing in to Garmin Connect");
        match client.login().await? {
            LoginOutcome::Authenticated => {}
            LoginOutcome::MfaRequired(challenge) => {
                let code = prompter
                    .input("MFA code required. Please enter it now", None)
                    .await?;
                client.resume_login(challenge, &code).await?;
            }
        }
    }
    Ok(Arc::new(client))
}

pub async fn build_sink(
    settings: &Settings,
    profile: &Profile,
    output: OutputType,
) -> SyncResult<Box<dyn Sink>> {
    match output {
        OutputType::Csv => {
            let path = profile
                .csv_path
                .clone()
                .unwrap_or_else(|| settings.default_csv_path(&profile.name));
            Ok(Box::new(CsvSink::new(path)))
        }
        OutputType::Sheets => {
            check_destination(profile, output)?;
            let sheet_id = profile.sheet_id.clone().unwrap_or_default();
            tracing::info!(
                "Initializing Google Sheets client for spreadsheet: '{}'",
                profile.spreadsheet_label()
            );
            let token = GoogleAuthorizer::new(
                &settings.client_secret_path,
                &settings.google_token_path,
            )
            .access_token()
            .await?;
            Ok(Box::new(
                SheetsSink::new(
                    &settings.sheets_api_base_url,
                    sheet_id,
                    profile.sheet_name(),
                    token,
                )
                .with_label(profile.spreadsheet_label()),
            ))
        }
    }
}
