//! Reader for the small comma-separated tables loaded at startup
//! (relation rules, vocabulary aliases).

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::{Error, Result};

/// Data rows of a headed table, each with the line it starts on.
///
/// Fields are trimmed and may be quoted. Lines starting with `#` and rows
/// whose fields are all blank are skipped. Rows are not required to match
/// the header width; callers check the shape they need.
pub(crate) fn read_rows(table: &str, text: &str) -> Result<Vec<(u64, StringRecord)>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map_or(0, |p| p.line());
            Error::InvalidInput(format!("{} line {}: {}", table, line, e))
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());
        rows.push((line, record));
    }
    Ok(rows)
}

/// Render a record back to its comma-joined form for error messages.
pub(crate) fn display_row(record: &StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join(",")
}
