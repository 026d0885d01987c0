// Primitives for turning file contents into raw rows.

use std::borrow::Cow;
use std::io::Cursor;

use calamine::{DataType, Ods, Range, Reader, Xls, Xlsx};
use encoding_rs::{UTF_8, WINDOWS_1252};

use snafu::prelude::*;

use crate::etl::{config_reader::FileSource, io_common::*, *};

/// Reads a file from disk, with the reading options of its configuration.
pub fn load_file(path: &str, cfs: &FileSource) -> EtlResult<InputFile> {
    info!("Attempting to read file {:?}", path);
    let content = fs::read(path).context(OpeningFileSnafu { path })?;
    Ok(InputFile {
        name: simplify_file_name(path),
        content,
        first_row_index: Some(cfs.first_row_index()?),
        excel_worksheet_name: cfs.excel_worksheet_name.clone(),
    })
}

/// Parses the content of a file into rows. The format is chosen from the extension.
pub fn read_table(file: &InputFile) -> EtlResult<Vec<RawRow>> {
    let header_row = file.first_row_index.unwrap_or(1).max(1);
    let path = file.name.as_str();
    let worksheet = file.excel_worksheet_name.as_deref();
    match file_extension(path).as_str() {
        "csv" | "txt" => read_csv_table(path, &file.content, header_row),
        "xlsx" | "xlsm" => {
            let workbook = Xlsx::new(Cursor::new(file.content.clone()))
                .map_err(calamine::Error::from)
                .context(OpeningExcelSnafu { path })?;
            read_workbook(workbook, path, worksheet, header_row)
        }
        "xls" => {
            let workbook = Xls::new(Cursor::new(file.content.clone()))
                .map_err(calamine::Error::from)
                .context(OpeningExcelSnafu { path })?;
            read_workbook(workbook, path, worksheet, header_row)
        }
        "ods" => {
            let workbook = Ods::new(Cursor::new(file.content.clone()))
                .map_err(calamine::Error::from)
                .context(OpeningExcelSnafu { path })?;
            read_workbook(workbook, path, worksheet, header_row)
        }
        _ => UnsupportedFileTypeSnafu { file_name: path }.fail(),
    }
}

/// Government exports are often encoded in Windows-1252 rather than UTF-8.
pub fn decode_text(content: &[u8]) -> Cow<str> {
    let (text, had_errors) = UTF_8.decode_with_bom_removal(content);
    if !had_errors {
        return text;
    }
    debug!("decode_text: not valid UTF-8, decoding as Windows-1252");
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(content);
    text
}

/// Semicolon when the header line holds more semicolons than commas.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// The text that follows the first `n` lines.
fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}

fn read_csv_table(path: &str, content: &[u8], header_row: usize) -> EtlResult<Vec<RawRow>> {
    let text = decode_text(content);
    // Preamble lines are skipped as text: the CSV reader ignores empty lines, which
    // would shift the header.
    let body = skip_lines(&text, header_row - 1);
    let delimiter = sniff_delimiter(body.lines().next().unwrap_or(""));
    debug!(
        "read_csv_table: {:?}: delimiter {:?}",
        path, delimiter as char
    );

    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(body.as_bytes());
    let mut records = rdr.into_records();

    let header: Vec<String> = match records.next() {
        Some(r) => r
            .context(CsvLineParseSnafu {
                path,
                lineno: header_row,
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
        None => {
            return MissingHeaderSnafu {
                path,
                lineno: header_row,
            }
            .fail()
        }
    };
    debug!("read_csv_table: header: {:?}", header);

    let mut res: Vec<RawRow> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = header_row + idx + 1;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let row = RawRow::new(
            header
                .iter()
                .cloned()
                .zip(line.iter().map(cell_from_text))
                .collect(),
        );
        if !row.is_blank() {
            res.push(row);
        }
    }
    Ok(res)
}

fn cell_from_text(s: &str) -> Cell {
    if s.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}

fn read_workbook<R>(
    mut workbook: R,
    path: &str,
    worksheet: Option<&str>,
    header_row: usize,
) -> EtlResult<Vec<RawRow>>
where
    R: Reader,
    calamine::Error: From<R::Error>,
{
    let wrange: Range<DataType> = match worksheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu {
                path,
                worksheet: name,
            })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?,
    }
    .map_err(calamine::Error::from)
    .context(OpeningExcelSnafu { path })?;

    // The range starts at the first non-empty cell, not at the first row of the sheet.
    let offset = wrange
        .start()
        .and_then(|(start_row, _)| (header_row - 1).checked_sub(start_row as usize))
        .context(MissingHeaderSnafu {
            path,
            lineno: header_row,
        })?;
    debug!(
        "read_workbook: {:?}: range starts at {:?}",
        path,
        wrange.start()
    );

    let mut iter = wrange.rows().skip(offset);
    let header: Vec<String> = iter
        .next()
        .context(MissingHeaderSnafu {
            path,
            lineno: header_row,
        })?
        .iter()
        .map(|c| cell_text(&cell_from_calamine(c)).unwrap_or_default())
        .collect();
    debug!("read_workbook: header: {:?}", header);

    let mut res: Vec<RawRow> = Vec::new();
    for row in iter {
        let raw = RawRow::new(
            header
                .iter()
                .cloned()
                .zip(row.iter().map(cell_from_calamine))
                .collect(),
        );
        if !raw.is_blank() {
            res.push(raw);
        }
    }
    Ok(res)
}

fn cell_from_calamine(cell: &DataType) -> Cell {
    match cell {
        DataType::String(s) => cell_from_text(s),
        DataType::Float(f) => Cell::Number(*f),
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::DateTime(f) => Cell::Number(*f),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        DataType::Empty => Cell::Empty,
        // Error cells (#N/A, #DIV/0!, ...)
        _ => Cell::Empty,
    }
}
