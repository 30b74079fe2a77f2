// Reader for Excel ballot files.

use calamine::{open_workbook, Reader, Xlsx};
use log::debug;
use snafu::prelude::*;

use crate::tally::io_common::make_default_id;
use crate::tally::*;

/// Reads ranked submissions from an Excel workbook, one submission per row.
///
/// Same layout as the CSV reader: a header row, an optional leading `id`
/// column, then one choice per column in rank order. The first worksheet is
/// used unless a name is given.
pub fn read_xlsx_submissions(
    path: &str,
    worksheet: Option<&str>,
) -> CountResult<Vec<ParsedSubmission>> {
    let default_id = make_default_id(path);

    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu {
        path: path.to_string(),
    })?;
    let wrange = match worksheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu {
                name: name.to_string(),
            })?
            .context(OpeningExcelSnafu {
                path: path.to_string(),
            })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu {
                path: path.to_string(),
            })?,
    };

    let header = wrange.rows().next().context(EmptyExcelSnafu {})?;
    debug!("read_xlsx_submissions: header: {:?}", header);
    let has_id_column = matches!(header.first(),
        Some(calamine::DataType::String(s)) if s.trim().eq_ignore_ascii_case("id"));
    let choices_start_col = if has_id_column { 1 } else { 0 };

    let mut iter = wrange.rows();
    iter.next();
    let mut res: Vec<ParsedSubmission> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        debug!("read_xlsx_submissions: {:?} {:?}", lineno, row);

        let mut choices: Vec<String> = Vec::new();
        for cell in row.iter().skip(choices_start_col) {
            match cell {
                calamine::DataType::String(s) if s.trim().is_empty() => {}
                calamine::DataType::String(s) => choices.push(s.trim().to_string()),
                calamine::DataType::Empty => {}
                _ => {
                    return ExcelWrongCellTypeSnafu {
                        lineno: lineno as u64,
                        content: format!("{:?}", cell),
                    }
                    .fail()
                }
            }
        }

        let id = if has_id_column {
            match row.first() {
                Some(calamine::DataType::String(s)) if !s.trim().is_empty() => {
                    s.trim().to_string()
                }
                _ => default_id(lineno),
            }
        } else {
            default_id(lineno)
        };
        res.push(ParsedSubmission {
            id: Some(id),
            choices,
        });
    }
    Ok(res)
}
