//! Google Sheets v4 sink: upserts one row per date into a named tab.

use super::{Sink, SinkReport};
use crate::error::{SyncError, SyncResult};
use crate::prompt::Prompter;
use crate::record::{Cell, DailyRecord, HEADERS};
use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
pub struct SpreadsheetMeta {
    #[serde(default)]
    pub properties: SheetProperties,
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SheetEntry {
    #[serde(default)]
    pub properties: SheetProperties,
}

#[derive(Debug, Default, Deserialize)]
pub struct SheetProperties {
    #[serde(default)]
    pub title: String,
}

impl SpreadsheetMeta {
    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets.iter().any(|s| s.properties.title == name)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Rows matched to existing spreadsheet rows or queued for appending.
#[derive(Debug, Default)]
struct Plan {
    updates: Vec<(usize, Vec<Value>)>,
    appends: Vec<Vec<Value>>,
}

fn plan(records: &[DailyRecord], existing: &HashMap<String, usize>) -> Plan {
    let mut plan = Plan::default();
    for record in records {
        let row: Vec<Value> = record.to_row().iter().map(Cell::to_json).collect();
        match existing.get(&record.date_key()) {
            Some(row_number) => plan.updates.push((*row_number, row)),
            None => plan.appends.push(row),
        }
    }
    plan
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Client for one tab of one spreadsheet.
#[derive(Debug)]
pub struct SheetsSink {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
    label: String,
    access_token: SecretString,
}

impl SheetsSink {
    pub fn new(
        base_url: &str,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        access_token: SecretString,
    ) -> Self {
        let spreadsheet_id = spreadsheet_id.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            label: format!("ID: {spreadsheet_id}"),
            spreadsheet_id,
            sheet_name: sheet_name.into(),
            access_token,
        }
    }

    /// Friendly spreadsheet name used in log lines.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// A1 range on this tab, with the tab name quoted.
    fn range(&self, cells: &str) -> String {
        format!("'{}'!{cells}", self.sheet_name.replace('\'', "''"))
    }

    fn url(&self, tail: &[&str]) -> SyncResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SyncError::Config(format!("invalid sheets base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Config("sheets base url cannot take a path".into()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets"])
            .extend(tail);
        Ok(url)
    }

    /// Execute a request and expect a JSON response.
    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> SyncResult<T> {
        let resp = request
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(resp.json::<T>().await?)
    }

    async fn error_from_response(resp: reqwest::Response) -> SyncError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();
        match status {
            401 | 403 => SyncError::GoogleAuth(format!("sheets API returned {status}: {body_snippet}")),
            _ => SyncError::Sheets(format!("HTTP {status}: {body_snippet}")),
        }
    }

    pub async fn spreadsheet_metadata(&self) -> SyncResult<SpreadsheetMeta> {
        let url = self.url(&[&self.spreadsheet_id])?;
        self.execute_json(
            self.http
                .get(url)
                .query(&[("fields", "properties.title,sheets.properties.title")]),
        )
        .await
    }

    async fn add_sheet(&self) -> SyncResult<()> {
        let url = self.url(&[&format!("{}:batchUpdate", self.spreadsheet_id)])?;
        let body = json!({"requests": [{"addSheet": {"properties": {"title": self.sheet_name}}}]});
        self.execute_json::<Value>(self.http.post(url).json(&body))
            .await?;
        Ok(())
    }

    async fn get_values(&self, range: &str) -> SyncResult<Vec<Vec<Value>>> {
        let url = self.url(&[&self.spreadsheet_id, "values", range])?;
        let values: ValueRange = self.execute_json(self.http.get(url)).await?;
        Ok(values.values)
    }

    async fn write_headers(&self) -> SyncResult<()> {
        let range = self.range("A1");
        let url = self.url(&[&self.spreadsheet_id, "values", &range])?;
        let body = json!({"range": range, "majorDimension": "ROWS", "values": [HEADERS]});
        self.execute_json::<Value>(
            self.http
                .put(url)
                .query(&[("valueInputOption", "RAW")])
                .json(&body),
        )
        .await?;
        Ok(())
    }

    /// Map of column-A text to 1-based row number.
    pub async fn existing_dates(&self) -> SyncResult<HashMap<String, usize>> {
        let rows = self.get_values(&self.range("A:A")).await?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| {
                let key = row.first().map(cell_text)?;
                (!key.is_empty()).then_some((key, i + 1))
            })
            .collect())
    }

    async fn update_rows(&self, updates: &[(usize, Vec<Value>)]) -> SyncResult<()> {
        let url = self.url(&[&self.spreadsheet_id, "values:batchUpdate"])?;
        let data: Vec<Value> = updates
            .iter()
            .map(|(row_number, row)| {
                json!({"range": self.range(&format!("A{row_number}")), "values": [row]})
            })
            .collect();
        let body = json!({"valueInputOption": "USER_ENTERED", "data": data});
        self.execute_json::<Value>(self.http.post(url).json(&body))
            .await?;
        Ok(())
    }

    async fn append_rows(&self, rows: &[Vec<Value>]) -> SyncResult<()> {
        let range = self.range("A1");
        let url = self.url(&[&self.spreadsheet_id, "values", &format!("{range}:append")])?;
        self.execute_json::<Value>(
            self.http
                .post(url)
                .query(&[
                    ("valueInputOption", "USER_ENTERED"),
                    ("insertDataOption", "INSERT_ROWS"),
                ])
                .json(&json!({"values": rows})),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Sink for SheetsSink {
    fn describe(&self) -> String {
        format!("sheet '{}' in spreadsheet '{}'", self.sheet_name, self.label)
    }

    async fn write(
        &self,
        records: &[DailyRecord],
        prompter: &mut dyn Prompter,
    ) -> SyncResult<SinkReport> {
        let meta = self.spreadsheet_metadata().await?;
        let title = if meta.properties.title.is_empty() {
            self.label.clone()
        } else {
            meta.properties.title.clone()
        };

        if !meta.has_sheet(&self.sheet_name) {
            tracing::info!("Sheet '{}' not found in '{}'. Creating it now.", self.sheet_name, title);
            self.add_sheet().await?;
        }
        if self.get_values(&self.range("A1")).await?.is_empty() {
            tracing::info!("Sheet '{}' is empty. Writing headers.", self.sheet_name);
            self.write_headers().await?;
        }

        let existing = self.existing_dates().await?;
        let plan = plan(records, &existing);
        let mut report = SinkReport::default();

        if !plan.updates.is_empty() {
            let question = format!(
                "{} date(s) already have rows in '{}'. Overwrite them?",
                plan.updates.len(),
                title
            );
            if prompter.confirm(&question, false).await? {
                tracing::info!("Updating {} existing rows in '{}'.", plan.updates.len(), title);
                self.update_rows(&plan.updates).await?;
                report.updated = plan.updates.len();
            } else {
                tracing::warn!("Leaving {} existing rows in '{}' untouched.", plan.updates.len(), title);
                report.skipped = plan.updates.len();
            }
        }

        if !plan.appends.is_empty() {
            tracing::info!("Appending {} new rows to '{}'.", plan.appends.len(), title);
            self.append_rows(&plan.appends).await?;
            report.appended = plan.appends.len();
        }

        if plan.updates.is_empty() && plan.appends.is_empty() {
            tracing::info!("No new data to update or append.");
        }
        Ok(report)
    }
}
