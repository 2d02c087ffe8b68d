//! Google Sheets v4 client over ureq.

use serde::Deserialize;
use serde_json::{Value, json};
use ureq::Agent;

use super::http::{self, bearer, endpoint, read_json};
use super::{Rows, SheetClient, ValueInput};
use crate::error::RemoteError;

const SERVICE: &str = "sheets";
const SPREADSHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct Spreadsheet {
    properties: SpreadsheetProperties,
}

#[derive(Deserialize)]
struct SpreadsheetProperties {
    title: String,
}

/// Formatted cells arrive as strings; anything else is rendered as its JSON text.
fn cell_text(v: Value) -> String {
    match v {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct SheetsClient {
    agent: Agent,
    token: String,
}

impl SheetsClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            agent: http::agent(http::DEFAULT_TIMEOUT),
            token: token.into(),
        }
    }
}

impl SheetClient for SheetsClient {
    fn get_range(&self, sheet_id: &str, range: &str) -> Result<Rows, RemoteError> {
        let url = endpoint(SPREADSHEETS_URL, &[sheet_id, "values", range])?;
        let resp = self
            .agent
            .get(url.as_str())
            .header("Authorization", bearer(&self.token))
            .call()?;
        let vr: ValueRange = read_json(SERVICE, resp)?;
        Ok(vr
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    fn update_range(
        &self,
        sheet_id: &str,
        range: &str,
        values: &Rows,
        mode: ValueInput,
    ) -> Result<(), RemoteError> {
        let url = endpoint(SPREADSHEETS_URL, &[sheet_id, "values", range])?;
        let resp = self
            .agent
            .put(url.as_str())
            .header("Authorization", bearer(&self.token))
            .query("valueInputOption", mode.as_str())
            .send_json(json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": values,
            }))?;
        http::check_status(SERVICE, resp)?;
        Ok(())
    }

    fn get_title(&self, sheet_id: &str) -> Result<String, RemoteError> {
        let url = endpoint(SPREADSHEETS_URL, &[sheet_id])?;
        let resp = self
            .agent
            .get(url.as_str())
            .header("Authorization", bearer(&self.token))
            .query("fields", "properties.title")
            .call()?;
        let sheet: Spreadsheet = read_json(SERVICE, resp)?;
        Ok(sheet.properties.title)
    }
}
