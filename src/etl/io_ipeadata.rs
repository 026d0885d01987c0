// Long series from IPEADATA: one row per (series, territory, date). The name of the
// value column carries the unit, e.g. `VALUE (R$)`.

use snafu::prelude::*;

use crate::etl::{io_common::*, *};

const VALUE_COLUMN_PREFIX: &str = "VALUE";
const CODE_COLUMNS: &[&str] = &["TERCODIGO", "Código", "Codigo"];
const YEAR_COLUMNS: &[&str] = &["YEAR", "ANO"];
const SERIES_COLUMNS: &[&str] = &["CODE", "SERCODIGO"];
const LEVEL_COLUMNS: &[&str] = &["NIVNOME"];
const MUNICIPAL_LEVELS: &[&str] = &["Municípios", "Municipios"];

/// The series are published in thousands.
pub const UNIT_SCALE: f64 = 1000.0;

/// Scans the headers of the first row for the value column.
pub fn find_value_column(first_row: &RawRow) -> Option<String> {
    first_row
        .headers()
        .find(|h| h.trim().to_uppercase().starts_with(VALUE_COLUMN_PREFIX))
        .map(|h| h.to_string())
}

pub struct Ipeadata;

impl SourceNormalizer for Ipeadata {
    fn normalize(
        &self,
        rows: &[RawRow],
        file_name: &str,
        stats: &mut NormalizeStats,
    ) -> EtlResult<Vec<Observation>> {
        let first_row = match rows.first() {
            Some(r) => r,
            None => {
                debug!("ipeadata: {:?}: no rows", file_name);
                return Ok(Vec::new());
            }
        };
        let value_column =
            find_value_column(first_row).context(ValueColumnNotFoundSnafu { file_name })?;
        let default_indicator = file_stem(file_name);
        debug!(
            "ipeadata: {:?}: value column {:?}, {} rows",
            file_name,
            value_column,
            rows.len()
        );

        let mut res: Vec<Observation> = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            stats.rows_read += 1;
            if let Some(level) = find_text(row, LEVEL_COLUMNS) {
                if !is_listed(&level, MUNICIPAL_LEVELS) {
                    stats.rows_filtered += 1;
                    continue;
                }
            }
            let code = find_text(row, CODE_COLUMNS);
            let year = find_text(row, YEAR_COLUMNS);
            let (code, year) = match (code, year) {
                (Some(code), Some(year)) => (code, year),
                (code, year) => {
                    debug!(
                        "ipeadata: row {}: skipping, code: {:?} year: {:?}",
                        idx, code, year
                    );
                    stats.rows_skipped += 1;
                    continue;
                }
            };
            let indicator_name =
                find_text(row, SERIES_COLUMNS).unwrap_or_else(|| default_indicator.clone());
            match cell_value(row.get(&value_column), NumberFormat::Plain, &[]) {
                CellValue::Value(value) => res.push(Observation {
                    municipality_code: code,
                    indicator_name,
                    year,
                    value: value * UNIT_SCALE,
                }),
                CellValue::Missing => stats.missing_values += 1,
                CellValue::Invalid => {
                    debug!(
                        "ipeadata: row {}: invalid value {:?}",
                        idx,
                        row.get(&value_column)
                    );
                    stats.invalid_values += 1;
                }
            }
        }
        Ok(res)
    }
}
