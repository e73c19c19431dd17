//! Rule-table loading.
//!
//! The table is a CSV file with a header row. Columns are addressed by name:
//! `contains_all`, `contains_any`, `does_not_contain`, `response_type`,
//! `response_content`. Keyword cells hold a `;`-separated list.

use std::io;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use tracing::warn;

use crate::error::RulesError;
use crate::pipeline::types::{OutboundResponse, ResponseType, Rule, normalize_keywords};

/// Separator between keywords inside one cell.
pub const KEYWORD_DELIMITER: char = ';';

/// Column positions resolved from the header row.
#[derive(Debug, Default)]
struct Columns {
    contains_all: Option<usize>,
    contains_any: Option<usize>,
    does_not_contain: Option<usize>,
    response_type: Option<usize>,
    response_content: Option<usize>,
}

impl Columns {
    fn locate(headers: &ByteRecord) -> Self {
        let mut columns = Self::default();
        for (idx, raw) in headers.iter().enumerate() {
            let name = String::from_utf8_lossy(raw);
            let slot = match name.trim().trim_start_matches('\u{feff}') {
                "contains_all" => &mut columns.contains_all,
                "contains_any" => &mut columns.contains_any,
                "does_not_contain" => &mut columns.does_not_contain,
                "response_type" => &mut columns.response_type,
                "response_content" => &mut columns.response_content,
                _ => continue,
            };
            slot.get_or_insert(idx);
        }
        columns
    }
}

/// Load rules from a CSV file on disk.
pub fn load_rules(path: &Path) -> Result<Vec<Rule>, RulesError> {
    let file = std::fs::File::open(path).map_err(|e| RulesError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_rules(file, &path.display().to_string())
}

/// Parse rules from any CSV source. `source` is only used in errors and logs.
pub fn parse_rules<R: io::Read>(input: R, source: &str) -> Result<Vec<Rule>, RulesError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);

    let malformed = |e: csv::Error| RulesError::Malformed {
        path: source.to_string(),
        reason: e.to_string(),
    };

    let columns = Columns::locate(reader.byte_headers().map_err(malformed)?);

    let mut rules = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(malformed)?;
        let row = rules.len() + 1;

        let keywords = |column: Option<usize>, name: &str| -> Vec<String> {
            match keyword_cell(&record, column) {
                Ok(cell) => normalize_keywords(cell.split(KEYWORD_DELIMITER)),
                Err(e) => {
                    warn!(
                        source,
                        row,
                        column = name,
                        error = %e,
                        "Unreadable keyword cell; treating as empty"
                    );
                    Vec::new()
                }
            }
        };

        let contains_all = keywords(columns.contains_all, "contains_all");
        let contains_any = keywords(columns.contains_any, "contains_any");
        let does_not_contain = keywords(columns.does_not_contain, "does_not_contain");

        let response_type = ResponseType::parse(&text_cell(&record, columns.response_type));
        let content = text_cell(&record, columns.response_content).trim().to_string();

        rules.push(Rule {
            contains_all,
            contains_any,
            does_not_contain,
            response: OutboundResponse {
                response_type,
                content,
            },
        });
    }

    Ok(rules)
}

fn keyword_cell(record: &ByteRecord, column: Option<usize>) -> Result<&str, std::str::Utf8Error> {
    match column.and_then(|idx| record.get(idx)) {
        Some(bytes) => std::str::from_utf8(bytes),
        None => Ok(""),
    }
}

fn text_cell(record: &ByteRecord, column: Option<usize>) -> String {
    column
        .and_then(|idx| record.get(idx))
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}
