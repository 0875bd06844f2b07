//! Extractors for the portal's HTML and JSON responses.
//!
//! Everything here is synchronous and owns its output: `scraper::Html` is not
//! `Send`, so documents never live across an `.await`.

use scraper::{ElementRef, Html, Selector};

use crate::errors::PortalError;

use super::types::{NumberRecord, SmsMessage};

pub const SMS_TABLE_ID: &str = "my_live_sms_table";

fn select_first<'a>(doc: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel).next()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Hidden `_token` input of the login form.
pub fn login_form_token(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let input = select_first(&doc, r#"input[name="_token"]"#)?;
    input.value().attr("value").map(|v| v.to_string())
}

/// `<meta name="csrf-token">` of an authenticated page. Empty content counts as absent.
pub fn csrf_meta_token(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let meta = select_first(&doc, r#"meta[name="csrf-token"]"#)?;
    let content = meta.value().attr("content")?.trim();
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// Rows of the live SMS table, in document order.
///
/// Returns `None` when the table is missing. The first row is the header and
/// is skipped; rows with fewer than three cells are ignored.
pub fn sms_table(html: &str) -> Option<Vec<SmsMessage>> {
    let doc = Html::parse_document(html);
    let table = select_first(&doc, &format!("table#{SMS_TABLE_ID}"))?;
    let row_sel = Selector::parse("tr").ok()?;
    let cell_sel = Selector::parse("td").ok()?;

    let mut out = Vec::new();
    for row in table.select(&row_sel).skip(1) {
        let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).take(3).collect();
        if cells.len() < 3 {
            continue;
        }
        out.push(SmsMessage {
            number: cell_text(cells[0]),
            message: cell_text(cells[1]),
            date: cell_text(cells[2]),
        });
    }
    Some(out)
}

/// Decode the numbers endpoint body (`{"data": [...]}`), keeping array order.
///
/// A `null` data field is an empty list. Elements without a `number` are
/// dropped with a warning.
pub fn numbers_payload(body: &str) -> Result<Vec<NumberRecord>, PortalError> {
    let v: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| PortalError::Malformed(format!("numbers body is not json: {e}")))?;

    let data = match v.get("data") {
        None => {
            return Err(PortalError::Malformed(
                "numbers body has no `data` field".to_string(),
            ))
        }
        Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => items.clone(),
        Some(_) => {
            return Err(PortalError::Malformed(
                "numbers `data` field is not an array".to_string(),
            ))
        }
    };

    let total = data.len();
    let records: Vec<NumberRecord> = data
        .into_iter()
        .filter_map(NumberRecord::from_value)
        .collect();
    if records.len() < total {
        tracing::warn!(
            dropped = total - records.len(),
            "numbers payload contained records without a number"
        );
    }
    Ok(records)
}
