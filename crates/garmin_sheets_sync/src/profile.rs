//! Named credential sets read from `USER<n>_*` environment variables.

use crate::error::{SyncError, SyncResult};
use regex::Regex;
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::LazyLock;

pub const DEFAULT_SHEET_NAME: &str = "Raw Data";

static PROFILE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(USER(\d+))_(GARMIN_EMAIL|GARMIN_PASSWORD|SHEET_ID|SHEET_NAME|SPREADSHEET_NAME|CSV_PATH)$",
    )
    .expect("profile key regex")
});

/// One user's Garmin credentials and output destination.
#[derive(Debug, Default)]
pub struct Profile {
    pub name: String,
    pub email: Option<String>,
    pub password: Option<SecretString>,
    pub sheet_id: Option<String>,
    pub sheet_name: Option<String>,
    pub spreadsheet_name: Option<String>,
    pub csv_path: Option<PathBuf>,
}

impl Profile {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn sheet_name(&self) -> &str {
        self.sheet_name.as_deref().unwrap_or(DEFAULT_SHEET_NAME)
    }

    /// Human-readable spreadsheet label for log lines and prompts.
    pub fn spreadsheet_label(&self) -> String {
        match (&self.spreadsheet_name, &self.sheet_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("ID: {id}"),
            (None, None) => "(no spreadsheet configured)".to_string(),
        }
    }

    /// Email and password, or `MissingCredentials` when either is unset.
    pub fn credentials(&self) -> SyncResult<(&str, &SecretString)> {
        match (&self.email, &self.password) {
            (Some(email), Some(password)) => Ok((email.as_str(), password)),
            _ => Err(SyncError::MissingCredentials(self.name.clone())),
        }
    }

    fn set(&mut self, field: &str, value: String) {
        let value = value.trim().to_string();
        if value.is_empty() {
            return;
        }
        match field {
            "GARMIN_EMAIL" => self.email = Some(value),
            "GARMIN_PASSWORD" => self.password = Some(SecretString::new(value.into())),
            "SHEET_ID" => self.sheet_id = Some(value),
            "SHEET_NAME" => self.sheet_name = Some(value),
            "SPREADSHEET_NAME" => self.spreadsheet_name = Some(value),
            "CSV_PATH" => self.csv_path = Some(PathBuf::from(value)),
            _ => {}
        }
    }
}

/// Drop variables whose name or value is not valid UTF-8; none of them can be
/// a profile key.
fn utf8_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// All configured profiles, ordered by their numeric suffix.
#[derive(Debug, Default)]
pub struct Profiles {
    by_number: BTreeMap<(u64, String), Profile>,
}

impl Profiles {
    pub fn from_env() -> Self {
        Self::from_vars(utf8_vars(std::env::vars_os()))
    }

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut by_number: BTreeMap<(u64, String), Profile> = BTreeMap::new();
        for (key, value) in vars {
            let Some(caps) = PROFILE_KEY_RE.captures(&key) else {
                continue;
            };
            let name = &caps[1];
            let number = caps[2].parse::<u64>().unwrap_or(u64::MAX);
            by_number
                .entry((number, name.to_string()))
                .or_insert_with(|| Profile::named(name))
                .set(&caps[3], value);
        }
        Self { by_number }
    }

    pub fn get(&self, name: &str) -> SyncResult<&Profile> {
        let wanted = name.trim().to_ascii_uppercase();
        self.iter()
            .find(|p| p.name == wanted)
            .ok_or_else(|| SyncError::ProfileNotFound(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.by_number.values()
    }

    pub fn names(&self) -> Vec<String> {
        self.iter().map(|p| p.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.by_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_number.is_empty()
    }
}
