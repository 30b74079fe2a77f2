// Primitives for reading CSV ballot files.

use log::debug;
use snafu::prelude::*;

use crate::tally::io_common::make_default_id;
use crate::tally::*;

/// Reads ranked submissions from a CSV export.
///
/// The first row is a header. A leading `id` column (recognized by its header)
/// carries the submission ids; every other column is a choice, best ranked
/// first. Blank cells are skipped.
pub fn read_csv_submissions(path: &str) -> CountResult<Vec<ParsedSubmission>> {
    let default_id = make_default_id(path);

    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {})?;
    let mut records = rdr.into_records();

    let header = match records.next() {
        Some(line_r) => line_r.context(CsvLineParseSnafu { lineno: 1usize })?,
        None => return Ok(Vec::new()),
    };
    debug!("read_csv_submissions: header: {:?}", header);
    let has_id_column = header
        .get(0)
        .map(|h| h.trim().eq_ignore_ascii_case("id"))
        .unwrap_or(false);
    let choices_start_col = if has_id_column { 1 } else { 0 };

    let mut res: Vec<ParsedSubmission> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        debug!("read_csv_submissions: {:?} {:?}", lineno, line);

        let id = if has_id_column {
            line.get(0)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        } else {
            None
        };
        let choices: Vec<String> = line
            .iter()
            .skip(choices_start_col)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        res.push(ParsedSubmission {
            id: Some(id.unwrap_or_else(|| default_id(lineno))),
            choices,
        });
    }
    Ok(res)
}
