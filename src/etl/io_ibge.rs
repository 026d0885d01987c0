// Economic census tables from IBGE (GDP of municipalities, central register of
// enterprises). Both tags share the same layout.

use crate::etl::{io_common::*, *};

const CODE_COLUMNS: &[&str] = &[
    "Cód.",
    "Cod.",
    "Código",
    "Codigo",
    "Código do Município",
    "Codigo do Municipio",
    "CD_MUN",
];

const YEAR_COLUMNS: &[&str] = &["Ano", "ANO"];

const DESCRIPTIVE_COLUMNS: &[&str] = &[
    "Nível",
    "Nivel",
    "Município",
    "Municipio",
    "Nome do Município",
    "Nome do Municipio",
    "Unidade da Federação",
    "Unidade da Federacao",
    "Sigla da Unidade da Federação",
    "Sigla da Unidade da Federacao",
    "UF",
    "Região",
    "Regiao",
    "Nome da Grande Região",
    "Nome da Grande Regiao",
];

/// Published when a figure is absent.
const PLACEHOLDERS: &[&str] = &["-"];

const LAYOUT: WideLayout = WideLayout {
    code_columns: CODE_COLUMNS,
    year_columns: YEAR_COLUMNS,
    excluded_columns: DESCRIPTIVE_COLUMNS,
    placeholders: PLACEHOLDERS,
    number_format: NumberFormat::Locale,
};

pub struct IbgeCensus;

impl SourceNormalizer for IbgeCensus {
    fn normalize(
        &self,
        rows: &[RawRow],
        file_name: &str,
        stats: &mut NormalizeStats,
    ) -> EtlResult<Vec<Observation>> {
        debug!("ibge: {:?}: {} rows", file_name, rows.len());
        Ok(melt_wide(rows, &LAYOUT, stats))
    }
}
