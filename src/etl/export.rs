// Writer for the exchange format: semicolon-separated, decimal comma.

use std::io::Write;

use snafu::prelude::*;

use crate::etl::*;

pub const OUTPUT_HEADER: [&str; 6] = [
    "Codigo_Municipio",
    "Nome_Indicador",
    "Ano_Observacao",
    "Valor",
    "Indice_Posicional",
    "Posicao",
];

/// Renders a number with a decimal comma: 1234.56 -> `1234,56`.
pub fn format_decimal(x: f64) -> String {
    x.to_string().replace('.', ",")
}

pub fn write_csv<W: Write>(records: &[OutputRecord], writer: W) -> EtlResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(writer);
    wtr.write_record(OUTPUT_HEADER).context(CsvWriteSnafu {})?;
    for r in records.iter() {
        wtr.write_record([
            r.municipality_code.clone(),
            r.indicator_name.clone(),
            r.year.clone(),
            format_decimal(r.value),
            format_decimal(r.positional_index),
            r.position.to_string(),
        ])
        .context(CsvWriteSnafu {})?;
    }
    wtr.flush().context(OutputWriteSnafu { path: "<csv>" })?;
    Ok(())
}

pub fn to_csv_string(records: &[OutputRecord]) -> EtlResult<String> {
    let mut buf: Vec<u8> = Vec::new();
    write_csv(records, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
