// Sanitation and utilities indicators (SNIS), one column per indicator.

use crate::etl::{io_common::*, *};

const CODE_COLUMNS: &[&str] = &[
    "Código do Município",
    "Codigo do Municipio",
    "Código IBGE",
    "Codigo IBGE",
    "Cod_IBGE",
];

const YEAR_COLUMNS: &[&str] = &["Ano de Referência", "Ano de Referencia", "Ano"];

const DESCRIPTIVE_COLUMNS: &[&str] = &[
    "Município",
    "Municipio",
    "Estado",
    "UF",
    "Região",
    "Regiao",
    "Prestadores",
    "Prestador",
    "Código do Prestador",
    "Codigo do Prestador",
    "Sigla do Prestador",
    "Abrangência",
    "Abrangencia",
    "Tipo de Serviço",
    "Tipo de Servico",
    "Natureza Jurídica",
    "Natureza Juridica",
    "Serviços",
    "Servicos",
];

const LAYOUT: WideLayout = WideLayout {
    code_columns: CODE_COLUMNS,
    year_columns: YEAR_COLUMNS,
    excluded_columns: DESCRIPTIVE_COLUMNS,
    placeholders: &[],
    number_format: NumberFormat::Locale,
};

pub struct Snis;

impl SourceNormalizer for Snis {
    fn normalize(
        &self,
        rows: &[RawRow],
        file_name: &str,
        stats: &mut NormalizeStats,
    ) -> EtlResult<Vec<Observation>> {
        debug!("snis: {:?}: {} rows", file_name, rows.len());
        Ok(melt_wide(rows, &LAYOUT, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> RawRow {
        RawRow::new(
            cells
                .iter()
                .map(|(h, v)| (h.to_string(), Cell::Text(v.to_string())))
                .collect(),
        )
    }

    #[test]
    fn melts_indicator_columns() {
        let rows = vec![
            row(&[
                ("Código do Município", "355030"),
                ("Município", "São Paulo"),
                ("Estado", "SP"),
                ("Ano de Referência", "2021"),
                ("Prestadores", "SABESP"),
                ("IN055 - Índice de atendimento total de água", "99,3"),
                ("AG001 - População total atendida com abastecimento de água", "11.451.999"),
            ]),
            row(&[
                ("Código do Município", "330455"),
                ("Município", "Rio de Janeiro"),
                ("Estado", "RJ"),
                ("Ano de Referência", "2021"),
                ("Prestadores", "CEDAE"),
                ("IN055 - Índice de atendimento total de água", ""),
                ("AG001 - População total atendida com abastecimento de água", "6.700.000"),
            ]),
        ];
        let (obs, stats) = normalize_rows("SNIS", &rows, "snis_2021.csv").unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].municipality_code, "355030");
        assert_eq!(obs[0].year, "2021");
        assert_eq!(
            obs[0].indicator_name,
            "IN055 - Índice de atendimento total de água"
        );
        assert_eq!(obs[0].value, 99.3);
        assert_eq!(obs[1].value, 11451999.0);
        assert_eq!(obs[2].municipality_code, "330455");
        assert_eq!(stats.missing_values, 1);
        assert_eq!(stats.observations, 3);
    }

    #[test]
    fn header_fallbacks() {
        let rows = vec![row(&[
            ("Cod_IBGE", "3550308"),
            ("ANO", "2019"),
            ("UF", "SP"),
            ("IN015", "54,2"),
        ])];
        let (obs, _) = normalize_rows("SNIS", &rows, "snis.csv").unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].municipality_code, "3550308");
        assert_eq!(obs[0].year, "2019");
        assert_eq!(obs[0].indicator_name, "IN015");
    }
}
