// Primitives shared by the source normalizers.

use std::path::Path;

use crate::etl::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Lowercased extension, empty if there is none.
pub fn file_extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}

/// How the text of a numeric cell is written.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum NumberFormat {
    /// `1.234,56`: periods group thousands, the comma is the decimal mark.
    Locale,
    /// `1234.56`
    Plain,
}

/// Parses `1.234,56` as 1234.56. The thousands separators are removed first, then
/// the decimal comma becomes a decimal point.
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace('.', "").replace(',', ".");
    parse_plain_number(&cleaned)
}

pub fn parse_plain_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// The outcome of reading a value cell.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum CellValue {
    Value(f64),
    /// Blank cell or placeholder: nothing was published.
    Missing,
    /// Some content that is not a number.
    Invalid,
}

pub fn cell_value(cell: Option<&Cell>, format: NumberFormat, placeholders: &[&str]) -> CellValue {
    match cell {
        None | Some(Cell::Empty) => CellValue::Missing,
        Some(Cell::Number(x)) if x.is_finite() => CellValue::Value(*x),
        Some(Cell::Number(_)) => CellValue::Invalid,
        Some(Cell::Text(s)) => {
            let t = s.trim();
            if t.is_empty() || placeholders.contains(&t) {
                return CellValue::Missing;
            }
            let parsed = match format {
                NumberFormat::Locale => parse_locale_number(t),
                NumberFormat::Plain => parse_plain_number(t),
            };
            match parsed {
                Some(x) => CellValue::Value(x),
                None => CellValue::Invalid,
            }
        }
    }
}

/// The trimmed text of an identifier cell (code, year, label).
///
/// Numeric spreadsheet cells are rendered without their fractional part when they
/// are integral, so that the code 3550308 does not become `3550308.0`.
pub fn cell_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Cell::Text(_) => None,
        Cell::Number(x) if x.is_finite() && x.fract() == 0.0 => Some(format!("{:.0}", x)),
        Cell::Number(x) if x.is_finite() => Some(x.to_string()),
        Cell::Number(_) => None,
        Cell::Empty => None,
    }
}

/// Convenience: the text of the first non-blank candidate column.
pub fn find_text(row: &RawRow, candidates: &[&str]) -> Option<String> {
    row.find(candidates).and_then(cell_text)
}

fn same_header(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

pub fn is_listed(header: &str, list: &[&str]) -> bool {
    list.iter().any(|h| same_header(header, h))
}

/// Description of a wide table: one row per municipality and year, one column per indicator.
#[derive(Debug, Clone, Copy)]
pub struct WideLayout {
    pub code_columns: &'static [&'static str],
    pub year_columns: &'static [&'static str],
    /// The descriptive columns that are not indicators.
    pub excluded_columns: &'static [&'static str],
    pub placeholders: &'static [&'static str],
    pub number_format: NumberFormat,
}

impl WideLayout {
    fn is_indicator(&self, header: &str) -> bool {
        !header.trim().is_empty()
            && !is_listed(header, self.code_columns)
            && !is_listed(header, self.year_columns)
            && !is_listed(header, self.excluded_columns)
    }
}

/// Turns a wide table into observations, one per (row, indicator column) with a valid value.
pub fn melt_wide(
    rows: &[RawRow],
    layout: &WideLayout,
    stats: &mut NormalizeStats,
) -> Vec<Observation> {
    let mut res: Vec<Observation> = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        stats.rows_read += 1;
        let code = find_text(row, layout.code_columns);
        let year = find_text(row, layout.year_columns);
        let (code, year) = match (code, year) {
            (Some(code), Some(year)) => (code, year),
            (code, year) => {
                debug!(
                    "melt_wide: row {}: skipping, code: {:?} year: {:?}",
                    idx, code, year
                );
                stats.rows_skipped += 1;
                continue;
            }
        };
        for (header, cell) in row.cells() {
            if !layout.is_indicator(header) {
                continue;
            }
            match cell_value(Some(cell), layout.number_format, layout.placeholders) {
                CellValue::Value(value) => res.push(Observation {
                    municipality_code: code.clone(),
                    indicator_name: header.trim().to_string(),
                    year: year.clone(),
                    value,
                }),
                CellValue::Missing => stats.missing_values += 1,
                CellValue::Invalid => {
                    debug!(
                        "melt_wide: row {}: dropping {:?} = {:?}",
                        idx, header, cell
                    );
                    stats.invalid_values += 1;
                }
            }
        }
    }
    res
}
