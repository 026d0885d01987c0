// Municipal budget accounts (FINBRA). The year is only present in the file name.

use lazy_static::lazy_static;
use regex::Regex;

use snafu::prelude::*;

use crate::etl::{io_common::*, *};

lazy_static! {
    static ref YEAR_IN_FILE_NAME: Regex = Regex::new(r"(?i)_(\d{4})\.(csv|xlsx|xls)$").unwrap();
}

const CODE_COLUMNS: &[&str] = &["Cod.IBGE", "Cod IBGE", "Código IBGE", "Codigo IBGE", "CodIBGE"];
const ACCOUNT_COLUMNS: &[&str] = &["Conta"];
const LABEL_COLUMNS: &[&str] = &["Coluna"];
const VALUE_COLUMNS: &[&str] = &["Valor"];

/// Joins the account name and the column label into the indicator name.
pub const INDICATOR_SEPARATOR: &str = " em ";

/// `finbra_receitas_2021.csv` -> `2021`
pub fn year_from_file_name(file_name: &str) -> Option<String> {
    YEAR_IN_FILE_NAME
        .captures(&simplify_file_name(file_name))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct Finbra;

impl SourceNormalizer for Finbra {
    fn normalize(
        &self,
        rows: &[RawRow],
        file_name: &str,
        stats: &mut NormalizeStats,
    ) -> EtlResult<Vec<Observation>> {
        let year =
            year_from_file_name(file_name).context(FileYearExtractionFailedSnafu { file_name })?;
        debug!("finbra: {:?}: year {}, {} rows", file_name, year, rows.len());

        let mut res: Vec<Observation> = Vec::new();
        for (idx, row) in rows.iter().enumerate() {
            stats.rows_read += 1;
            let code = find_text(row, CODE_COLUMNS);
            let account = find_text(row, ACCOUNT_COLUMNS);
            let label = find_text(row, LABEL_COLUMNS);
            let (code, account, label) = match (code, account, label) {
                (Some(c), Some(a), Some(l)) => (c, a, l),
                x => {
                    debug!("finbra: row {}: skipping, incomplete {:?}", idx, x);
                    stats.rows_skipped += 1;
                    continue;
                }
            };
            match cell_value(row.find(VALUE_COLUMNS), NumberFormat::Locale, &[]) {
                CellValue::Value(value) => res.push(Observation {
                    municipality_code: code,
                    indicator_name: format!("{}{}{}", account, INDICATOR_SEPARATOR, label),
                    year: year.clone(),
                    value,
                }),
                CellValue::Missing => stats.missing_values += 1,
                CellValue::Invalid => {
                    debug!("finbra: row {}: invalid value {:?}", idx, row.find(VALUE_COLUMNS));
                    stats.invalid_values += 1;
                }
            }
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(code: &str, coluna: &str, conta: &str, valor: &str) -> RawRow {
        RawRow::new(vec![
            ("Instituição".to_string(), Cell::Text("Prefeitura".to_string())),
            ("Cod.IBGE".to_string(), Cell::Text(code.to_string())),
            ("UF".to_string(), Cell::Text("SP".to_string())),
            ("População".to_string(), Cell::Text("1000".to_string())),
            ("Coluna".to_string(), Cell::Text(coluna.to_string())),
            ("Conta".to_string(), Cell::Text(conta.to_string())),
            ("Valor".to_string(), Cell::Text(valor.to_string())),
        ])
    }

    #[test]
    fn year_from_names() {
        assert_eq!(
            year_from_file_name("finbra_receitas_2021.csv"),
            Some("2021".to_string())
        );
        assert_eq!(
            year_from_file_name("/tmp/dados/FINBRA_2019.CSV"),
            Some("2019".to_string())
        );
        assert_eq!(year_from_file_name("finbra_2019.xlsx"), Some("2019".to_string()));
        assert_eq!(year_from_file_name("finbra2019.csv"), None);
        assert_eq!(year_from_file_name("finbra_19.csv"), None);
        assert_eq!(year_from_file_name("finbra_2019.csv.bak"), None);
    }

    #[test]
    fn synthesized_indicator_names() {
        let rows = vec![
            row("3550308", "Receitas Brutas Realizadas", "1.0.0.0.00.0.0 - Receitas Correntes", "1.234,56"),
            row("3550308", "Deduções - FUNDEB", "1.0.0.0.00.0.0 - Receitas Correntes", "abc"),
            row("", "Receitas Brutas Realizadas", "Total Receitas", "10,00"),
        ];
        let (obs, stats) = normalize_rows("FINBRA", &rows, "finbra_2021.csv").unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(
            obs[0].indicator_name,
            "1.0.0.0.00.0.0 - Receitas Correntes em Receitas Brutas Realizadas"
        );
        assert_eq!(obs[0].year, "2021");
        assert_eq!(obs[0].value, 1234.56);
        assert_eq!(stats.invalid_values, 1);
        assert_eq!(stats.rows_skipped, 1);
    }

    #[test]
    fn missing_year_fails_the_file() {
        let rows = vec![row("3550308", "A", "B", "1,0")];
        let res = normalize_rows("FINBRA", &rows, "finbra.csv");
        assert!(matches!(
            res,
            Err(EtlError::FileYearExtractionFailed { .. })
        ));
    }
}
