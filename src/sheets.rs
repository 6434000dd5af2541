use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Cell, FetchedTable, Gid, Row, SheetName};
use crate::error::SyncError;
use crate::manifest::default_headers;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const GVIZ_BASE: &str = "https://docs.google.com/spreadsheets/d";
const JSONP_CALL: &str = "google.visualization.Query.setResponse(";

#[derive(Debug, Clone, Copy)]
pub struct TableRequest<'a> {
    pub sheet_id: &'a str,
    pub gid: &'a Gid,
    pub api_key: &'a str,
    pub query: Option<&'a str>,
    pub include_headers: bool,
}

pub trait SheetSource {
    /// Resolves the gid to its sheet title, then pulls the table rows.
    fn fetch_table(&self, request: &TableRequest<'_>) -> Result<FetchedTable, SyncError>;
}

impl<T: SheetSource + ?Sized> SheetSource for &T {
    fn fetch_table(&self, request: &TableRequest<'_>) -> Result<FetchedTable, SyncError> {
        (**self).fetch_table(request)
    }
}

#[derive(Clone)]
pub struct SheetsHttpClient {
    client: Client,
}

impl SheetsHttpClient {
    pub fn new() -> Result<Self, SyncError> {
        let client = Client::builder()
            .default_headers(default_headers()?)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| SyncError::SheetsHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn get_text(&self, request: reqwest::blocking::RequestBuilder) -> Result<String, SyncError> {
        let response = request
            .send()
            .map_err(|err| SyncError::SheetsHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "Sheets request failed".to_string());
            return Err(SyncError::SheetsStatus { status, message });
        }
        response
            .text()
            .map_err(|err| SyncError::SheetsHttp(err.to_string()))
    }

    fn sheet_name(&self, request: &TableRequest<'_>) -> Result<SheetName, SyncError> {
        let url = format!("{SHEETS_API_BASE}/{}", request.sheet_id);
        let body = self.get_text(self.client.get(&url).query(&[
            ("key", request.api_key),
            ("fields", "sheets(properties(sheetId,title))"),
        ]))?;
        resolve_sheet_name(&body, request.sheet_id, request.gid)
    }
}

impl SheetSource for SheetsHttpClient {
    fn fetch_table(&self, request: &TableRequest<'_>) -> Result<FetchedTable, SyncError> {
        let sheet_name = self.sheet_name(request)?;

        let url = format!("{GVIZ_BASE}/{}/gviz/tq", request.sheet_id);
        let mut params = vec![("gid", request.gid.as_str()), ("key", request.api_key)];
        if let Some(query) = request.query {
            params.push(("tq", query));
        }
        let body = self.get_text(self.client.get(&url).query(&params))?;

        let (header, rows) = parse_table(strip_jsonp(&body)?, request.include_headers)?;
        Ok(FetchedTable {
            sheet_name,
            header,
            rows,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    sheets: Vec<SheetInfo>,
}

#[derive(Debug, Deserialize)]
struct SheetInfo {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
}

/// Picks the title of the sheet whose id equals `gid` from a Sheets API
/// `spreadsheets.get` response and validates it.
pub fn resolve_sheet_name(body: &str, sheet_id: &str, gid: &Gid) -> Result<SheetName, SyncError> {
    let info: SpreadsheetInfo =
        serde_json::from_str(body).map_err(|err| SyncError::MalformedPayload(err.to_string()))?;
    let wanted = gid.as_number()?;
    let sheet = info
        .sheets
        .iter()
        .find(|sheet| sheet.properties.sheet_id == wanted)
        .ok_or_else(|| SyncError::SheetNotFound {
            sheet_id: sheet_id.to_string(),
            gid: gid.to_string(),
        })?;
    sheet.properties.title.parse()
}

/// The JSON object inside `google.visualization.Query.setResponse(...);`.
pub fn strip_jsonp(text: &str) -> Result<&str, SyncError> {
    let start = text
        .find(JSONP_CALL)
        .map(|idx| idx + JSONP_CALL.len())
        .ok_or_else(|| SyncError::MalformedPayload("missing JSONP wrapper".to_string()))?;
    let end = text
        .rfind(')')
        .filter(|end| *end >= start)
        .ok_or_else(|| SyncError::MalformedPayload("unterminated JSONP wrapper".to_string()))?;
    Ok(&text[start..end])
}

#[derive(Debug, Deserialize)]
struct GvizResponse {
    #[serde(default)]
    table: Option<GvizTable>,
}

#[derive(Debug, Deserialize)]
struct GvizTable {
    #[serde(default)]
    cols: Option<Vec<GvizColumn>>,
    #[serde(default)]
    rows: Option<Vec<GvizRow>>,
}

#[derive(Debug, Deserialize)]
struct GvizColumn {
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GvizRow {
    c: Vec<Option<GvizCell>>,
}

#[derive(Debug, Deserialize)]
struct GvizCell {
    #[serde(default)]
    v: Value,
}

/// Parses the gviz table payload into an optional header row (from column
/// labels) and the data rows.
pub fn parse_table(json: &str, include_headers: bool) -> Result<(Option<Row>, Vec<Row>), SyncError> {
    let response: GvizResponse =
        serde_json::from_str(json).map_err(|err| SyncError::MalformedPayload(err.to_string()))?;
    let table = response
        .table
        .ok_or_else(|| SyncError::MalformedPayload("'table' missing in response".to_string()))?;
    let rows = table
        .rows
        .ok_or_else(|| SyncError::MalformedPayload("'rows' missing in response".to_string()))?;

    let rows: Vec<Row> = rows
        .into_iter()
        .map(|row| {
            row.c
                .into_iter()
                .map(|cell| cell.map(|cell| cell_from_value(cell.v)).unwrap_or(Cell::Empty))
                .collect()
        })
        .collect();

    let header: Option<Row> = match (include_headers, table.cols) {
        (true, Some(cols)) => Some(
            cols.into_iter()
                .map(|col| col.label.map(Cell::Text).unwrap_or(Cell::Empty))
                .collect(),
        ),
        _ => None,
    };

    Ok((header, rows))
}

fn cell_from_value(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Bool(value) => Cell::Bool(value),
        Value::Number(value) => value.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
        Value::String(value) => Cell::Text(value),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SHEETS: &str = r#"{"sheets": [
        {"properties": {"sheetId": 0, "title": "Readme"}},
        {"properties": {"sheetId": 42, "title": "Air Quality"}},
        {"properties": {"sheetId": 7, "title": "Bad: Name"}}
    ]}"#;

    #[test]
    fn resolves_sheet_by_gid() {
        let name = resolve_sheet_name(SHEETS, "abc", &Gid::from("42")).unwrap();
        assert_eq!(name.as_str(), "Air Quality");
    }

    #[test]
    fn omitted_sheet_id_is_the_first_sheet() {
        let body = r#"{"sheets": [{"properties": {"title": "Summary"}}, {"properties": {"sheetId": 5, "title": "Raw"}}]}"#;
        let name = resolve_sheet_name(body, "abc", &Gid::from(0)).unwrap();
        assert_eq!(name.as_str(), "Summary");
        let name = resolve_sheet_name(body, "abc", &Gid::from(5)).unwrap();
        assert_eq!(name.as_str(), "Raw");
    }

    #[test]
    fn missing_and_invalid_sheets_fail() {
        let err = resolve_sheet_name(SHEETS, "abc", &Gid::from(99)).unwrap_err();
        assert_matches!(err, SyncError::SheetNotFound { .. });
        let err = resolve_sheet_name(SHEETS, "abc", &Gid::from(7)).unwrap_err();
        assert_matches!(err, SyncError::InvalidSheetName(_));
        let err = resolve_sheet_name(SHEETS, "abc", &Gid::from("x")).unwrap_err();
        assert_matches!(err, SyncError::InvalidGid(_));
    }

    #[test]
    fn strips_jsonp_wrapper() {
        let text = "/*O_o*/\ngoogle.visualization.Query.setResponse({\"a\":1});";
        assert_eq!(strip_jsonp(text).unwrap(), "{\"a\":1}");
        assert!(strip_jsonp("{\"a\":1}").is_err());
    }

    #[test]
    fn parses_rows_and_header() {
        let json = r#"{"version":"0.6","status":"ok","table":{
            "cols":[{"id":"A","label":"date","type":"date"},{"id":"B","label":"pm25","type":"number"}],
            "rows":[{"c":[{"v":"Date(2023,0,15)","f":"1/15/2023"},{"v":12.345}]},{"c":[null,{"v":null}]}]}}"#;
        let (header, rows) = parse_table(json, true).unwrap();
        assert_eq!(
            header,
            Some(vec![Cell::Text("date".into()), Cell::Text("pm25".into())])
        );
        assert_eq!(rows[0], vec![Cell::Text("Date(2023,0,15)".into()), Cell::Number(12.345)]);
        assert_eq!(rows[1], vec![Cell::Empty, Cell::Empty]);

        let (header, _) = parse_table(json, false).unwrap();
        assert_eq!(header, None);
    }

    #[test]
    fn error_payload_is_malformed() {
        let json = r#"{"status":"error","errors":[{"reason":"invalid_query"}]}"#;
        let err = parse_table(json, true).unwrap_err();
        assert_matches!(err, SyncError::MalformedPayload(_));
    }
}
