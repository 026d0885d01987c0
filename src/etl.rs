use log::{debug, info, warn};

use positional_index::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use text_diff::print_diff;

pub mod config_reader;
pub mod export;
pub mod io_common;
pub mod io_finbra;
pub mod io_ibge;
pub mod io_ipeadata;
pub mod io_snis;
pub mod io_table;
pub mod worker;

use crate::etl::config_reader::*;
use crate::etl::worker::{ProcessPayload, Request, Response, Worker};

#[derive(Debug, Snafu)]
pub enum EtlError {
    #[snafu(display("Unknown source type {source_type:?} (known types: {known})"))]
    UnknownSourceType { source_type: String, known: String },
    #[snafu(display("Unsupported file type for {file_name} (expected csv, txt, xlsx, xlsm, xls or ods)"))]
    UnsupportedFileType { file_name: String },
    #[snafu(display("Cannot extract the year from the file name {file_name} (expected a name ending with _YYYY.csv)"))]
    FileYearExtractionFailed { file_name: String },
    #[snafu(display("No value column (a header starting with VALUE) in {file_name}"))]
    ValueColumnNotFound { file_name: String },

    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening spreadsheet {path}"))]
    OpeningExcel {
        source: calamine::Error,
        path: String,
    },
    #[snafu(display("Spreadsheet {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("Spreadsheet {path} has no worksheet named {worksheet:?}"))]
    MissingWorksheet { path: String, worksheet: String },
    #[snafu(display("Error parsing line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("No header row at line {lineno} of {path}"))]
    MissingHeader { path: String, lineno: usize },
    #[snafu(display("Error writing the output"))]
    CsvWrite { source: csv::Error },
    #[snafu(display("Error writing the output to {path}"))]
    OutputWrite {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error serializing the JSON response"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Invalid number in the configuration: {content}"))]
    ParsingJsonNumber { content: String },
    #[snafu(display("The configuration file has no parent directory"))]
    #[snafu(visibility(pub(crate)))]
    MissingParentDir {},

    #[snafu(display("Cannot start the worker thread"))]
    SpawnWorker { source: std::io::Error },
    #[snafu(display("The worker is already processing a request"))]
    WorkerBusy {},
    #[snafu(display("The worker stopped before answering"))]
    WorkerGone {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

impl EtlError {
    /// Conditions that only cancel the contribution of one file. The other
    /// files of the batch are still processed.
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            EtlError::FileYearExtractionFailed { .. } | EtlError::ValueColumnNotFound { .. }
        )
    }
}

pub type EtlResult<T> = Result<T, EtlError>;

/// A cell of a raw table, as produced by the CSV or spreadsheet readers.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Text(String),
    /// Numeric spreadsheet cell. It is never cleaned as text.
    Number(f64),
    Empty,
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
            Cell::Empty => true,
        }
    }
}

/// A row of a raw table: the cells in column order, keyed by their trimmed header.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RawRow {
    cells: Vec<(String, Cell)>,
}

impl RawRow {
    pub fn new(cells: Vec<(String, Cell)>) -> RawRow {
        RawRow { cells }
    }

    pub fn cells(&self) -> impl Iterator<Item = &(String, Cell)> {
        self.cells.iter()
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    /// Exact lookup on the header.
    pub fn get(&self, header: &str) -> Option<&Cell> {
        self.cells.iter().find(|(h, _)| h == header).map(|(_, c)| c)
    }

    /// The first candidate header (compared case-insensitively) holding a non-blank cell.
    pub fn find(&self, candidates: &[&str]) -> Option<&Cell> {
        for cand in candidates.iter() {
            let cand = cand.trim().to_lowercase();
            let found = self
                .cells
                .iter()
                .find(|(h, c)| h.trim().to_lowercase() == cand && !c.is_blank());
            if let Some((_, c)) = found {
                return Some(c);
            }
        }
        None
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, c)| c.is_blank())
    }
}

/// A file submitted for processing.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct InputFile {
    pub name: String,
    pub content: Vec<u8>,
    /// 1-based index of the header row. Defaults to the first row.
    #[serde(rename = "firstRowIndex", default)]
    pub first_row_index: Option<usize>,
    #[serde(rename = "excelWorksheetName", default)]
    pub excel_worksheet_name: Option<String>,
}

impl InputFile {
    pub fn new(name: &str, content: &[u8]) -> InputFile {
        InputFile {
            name: name.to_string(),
            content: content.to_vec(),
            first_row_index: None,
            excel_worksheet_name: None,
        }
    }
}

/// Diagnostic counters of a normalization run.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct NormalizeStats {
    pub files_read: usize,
    pub files_skipped: usize,
    pub rows_read: usize,
    /// Rows without a municipality code or a year (or another required field).
    pub rows_skipped: usize,
    /// Rows outside of the municipal level.
    pub rows_filtered: usize,
    /// Blank cells and placeholders.
    pub missing_values: usize,
    /// Cells that did not clean up into a finite number.
    pub invalid_values: usize,
    pub observations: usize,
}

/// The contract shared by all the source types: raw rows of one file in, observations out.
pub trait SourceNormalizer {
    fn normalize(
        &self,
        rows: &[RawRow],
        file_name: &str,
        stats: &mut NormalizeStats,
    ) -> EtlResult<Vec<Observation>>;
}

static REGISTRY: &[(&str, &(dyn SourceNormalizer + Sync))] = &[
    ("SNIS", &io_snis::Snis),
    ("FINBRA", &io_finbra::Finbra),
    ("IBGE_PIB", &io_ibge::IbgeCensus),
    ("IBGE_CEMPRE", &io_ibge::IbgeCensus),
    ("IPEADATA", &io_ipeadata::Ipeadata),
];

pub fn source_types() -> Vec<&'static str> {
    REGISTRY.iter().map(|(tag, _)| *tag).collect()
}

pub fn normalizer_for(source_type: &str) -> EtlResult<&'static (dyn SourceNormalizer + Sync)> {
    REGISTRY
        .iter()
        .find(|(tag, _)| *tag == source_type)
        .map(|(_, n)| *n)
        .context(UnknownSourceTypeSnafu {
            source_type,
            known: source_types().join(", "),
        })
}

/// Normalizes the rows of a single file.
pub fn normalize_rows(
    source_type: &str,
    rows: &[RawRow],
    file_name: &str,
) -> EtlResult<(Vec<Observation>, NormalizeStats)> {
    let normalizer = normalizer_for(source_type)?;
    let mut stats = NormalizeStats::default();
    let observations = normalizer.normalize(rows, file_name, &mut stats)?;
    stats.observations = observations.len();
    Ok((observations, stats))
}

/// An enriched record, with the field names of the exchange format.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "Codigo_Municipio")]
    pub municipality_code: String,
    #[serde(rename = "Nome_Indicador")]
    pub indicator_name: String,
    #[serde(rename = "Ano_Observacao")]
    pub year: String,
    #[serde(rename = "Valor")]
    pub value: f64,
    #[serde(rename = "Indice_Posicional")]
    pub positional_index: f64,
    #[serde(rename = "Posicao")]
    pub position: u32,
}

impl From<&RankedObservation> for OutputRecord {
    fn from(r: &RankedObservation) -> OutputRecord {
        OutputRecord {
            municipality_code: r.municipality_code.clone(),
            indicator_name: r.indicator_name.clone(),
            year: r.year.clone(),
            value: r.value,
            positional_index: r.positional_index,
            position: r.position,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct ProcessOutcome {
    pub records: Vec<OutputRecord>,
    /// One message per file that was skipped.
    pub warnings: Vec<String>,
    pub stats: NormalizeStats,
    pub ranking: RankingSummary,
}

/// Normalizes all the files of a batch with the same source type, then ranks the
/// concatenated observations once.
///
/// An unknown source type or an unreadable file aborts the whole batch. A file
/// whose year or value column cannot be found only contributes a warning.
pub fn process_batch(files: &[InputFile], source_type: &str) -> EtlResult<ProcessOutcome> {
    let normalizer = normalizer_for(source_type)?;
    info!(
        "process_batch: {} file(s) of source type {}",
        files.len(),
        source_type
    );

    let mut stats = NormalizeStats::default();
    let mut warnings: Vec<String> = Vec::new();
    let mut observations: Vec<Observation> = Vec::new();
    for file in files.iter() {
        info!(
            "process_batch: reading {:?} ({} bytes)",
            file.name,
            file.content.len()
        );
        let rows = io_table::read_table(file)?;
        debug!("process_batch: {:?}: {} rows", file.name, rows.len());
        stats.files_read += 1;
        match normalizer.normalize(&rows, &file.name, &mut stats) {
            Ok(mut file_obs) => {
                info!(
                    "process_batch: {:?}: {} observations",
                    file.name,
                    file_obs.len()
                );
                observations.append(&mut file_obs);
            }
            Err(e) if e.is_file_level() => {
                warn!("process_batch: skipping {:?}: {}", file.name, e);
                stats.files_skipped += 1;
                warnings.push(format!("{}: {}", file.name, e));
            }
            Err(e) => return Err(e),
        }
    }
    stats.observations = observations.len();
    if stats.invalid_values > 0 {
        info!(
            "process_batch: {} value(s) could not be read as numbers and were dropped",
            stats.invalid_values
        );
    }
    info!("process_batch: {:?}", stats);

    let ranking = run_positional_index(&observations);
    Ok(ProcessOutcome {
        records: ranking.records.iter().map(OutputRecord::from).collect(),
        warnings,
        stats,
        ranking: ranking.summary,
    })
}

/// Where and how to write the result of a run.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RunOutput {
    /// A file path, `stdout`, or nothing for the standard output.
    pub out: Option<String>,
    /// A reference CSV file to compare the result with.
    pub reference: Option<String>,
    /// Emits the worker response (JSON) instead of the CSV file.
    pub json: bool,
}

/// Loads the files of a job, processes them and writes the result.
pub fn run_job(job: &JobConfig, root: &Path, output: &RunOutput) -> EtlResult<()> {
    info!("run_job: {:?}", job);
    if job.file_sources.is_empty() {
        whatever!("No input file given");
    }

    let mut files: Vec<InputFile> = Vec::new();
    for fs_cfg in job.file_sources.iter() {
        let p: PathBuf = root.join(&fs_cfg.file_path);
        files.push(io_table::load_file(&p.display().to_string(), fs_cfg)?);
    }

    if output.json {
        // Same message exchange as an interactive client.
        let worker = Worker::spawn()?;
        let response = worker.process(Request::Process {
            payload: ProcessPayload {
                files,
                source_type: job.source_type.clone(),
            },
        })?;
        let js = serde_json::to_string_pretty(&response).context(SerializingJsonSnafu {})?;
        write_output(output.out.as_deref(), &js)?;
        if let Response::Error { error } = response {
            whatever!("Processing failed: {}", error)
        }
        return Ok(());
    }

    let outcome = process_batch(&files, &job.source_type)?;
    for w in outcome.warnings.iter() {
        warn!("{}", w);
    }
    let csv_text = export::to_csv_string(&outcome.records)?;
    write_output(output.out.as_deref(), &csv_text)?;

    // The reference output, if provided for comparison
    if let Some(reference_p) = output.reference.as_deref() {
        let reference = read_reference(reference_p)?;
        if reference != normalize_newlines(&csv_text) {
            warn!("Found differences with the reference file");
            print_diff(reference.as_str(), csv_text.as_str(), "\n");
            whatever!("Difference detected between the computed output and the reference output")
        }
        info!("run_job: output matches the reference {:?}", reference_p);
    }
    Ok(())
}

fn write_output(out: Option<&str>, content: &str) -> EtlResult<()> {
    match out {
        None | Some("stdout") => {
            print!("{}", content);
            Ok(())
        }
        Some(path) => {
            info!("Writing output to {:?}", path);
            fs::write(path, content).context(OutputWriteSnafu { path })
        }
    }
}

pub(crate) fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_file(name: &str, content: &str) -> InputFile {
        InputFile::new(name, content.as_bytes())
    }

    const FINBRA_2020: &str = "Instituição;Cod.IBGE;UF;População;Coluna;Conta;Valor\n\
        Prefeitura A;3550308;SP;100;Receitas Brutas Realizadas;Receitas Correntes;1.000,50\n\
        Prefeitura B;3304557;RJ;200;Receitas Brutas Realizadas;Receitas Correntes;2.000,00\n";

    #[test]
    fn unknown_source_type_is_fatal() {
        let _ = env_logger::builder().is_test(true).try_init();
        let res = process_batch(&[csv_file("finbra_2020.csv", FINBRA_2020)], "SICONFI");
        assert!(matches!(res, Err(EtlError::UnknownSourceType { .. })));
        let res = normalize_rows("snis", &[], "x.csv");
        assert!(matches!(res, Err(EtlError::UnknownSourceType { .. })));
    }

    #[test]
    fn unsupported_file_type_is_fatal() {
        let files = vec![
            csv_file("finbra_2020.csv", FINBRA_2020),
            csv_file("finbra_2021.pdf", "%PDF"),
        ];
        let res = process_batch(&files, "FINBRA");
        assert!(matches!(res, Err(EtlError::UnsupportedFileType { .. })));
    }

    #[test]
    fn year_extraction_failure_only_skips_the_file() {
        let files = vec![
            csv_file("finbra_2020.csv", FINBRA_2020),
            csv_file("finbra_sem_ano.csv", FINBRA_2020),
        ];
        let outcome = process_batch(&files, "FINBRA").unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert!(outcome.records.iter().all(|r| r.year == "2020"));
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("finbra_sem_ano.csv"));
        assert_eq!(outcome.stats.files_read, 2);
        assert_eq!(outcome.stats.files_skipped, 1);
    }

    #[test]
    fn files_are_ranked_together() {
        let other = "Instituição;Cod.IBGE;UF;População;Coluna;Conta;Valor\n\
            Prefeitura C;4106902;PR;300;Receitas Brutas Realizadas;Receitas Correntes;1.500,00\n";
        let files = vec![
            csv_file("finbra_2020.csv", FINBRA_2020),
            csv_file("outra_2020.csv", other),
        ];
        let outcome = process_batch(&files, "FINBRA").unwrap();
        let codes: Vec<&str> = outcome
            .records
            .iter()
            .map(|r| r.municipality_code.as_str())
            .collect();
        assert_eq!(codes, vec!["3304557", "4106902", "3550308"]);
        assert_eq!(outcome.records[1].positional_index, 0.5);
        assert_eq!(outcome.records[1].position, 2);
        assert_eq!(outcome.ranking.num_groups, 1);
    }

    #[test]
    fn file_level_classification() {
        assert!(EtlError::FileYearExtractionFailed {
            file_name: "a".to_string()
        }
        .is_file_level());
        assert!(EtlError::ValueColumnNotFound {
            file_name: "a".to_string()
        }
        .is_file_level());
        assert!(!EtlError::UnsupportedFileType {
            file_name: "a".to_string()
        }
        .is_file_level());
    }

    #[test]
    fn raw_row_lookup() {
        let row = RawRow::new(vec![
            ("Código IBGE".to_string(), Cell::Empty),
            ("Cod_IBGE".to_string(), Cell::Text("355030".to_string())),
            ("Ano".to_string(), Cell::Number(2020.0)),
        ]);
        assert_eq!(
            row.find(&["código ibge", "COD_IBGE"]),
            Some(&Cell::Text("355030".to_string()))
        );
        assert_eq!(row.get("Ano"), Some(&Cell::Number(2020.0)));
        assert_eq!(row.get("ano"), None);
        assert!(!row.is_blank());
    }

    #[test]
    fn json_errors_name_their_direction() {
        let parse_err = serde_json::from_str::<u32>("x").unwrap_err();
        let e: EtlError = Err::<(), _>(parse_err)
            .context(SerializingJsonSnafu {})
            .unwrap_err();
        assert_eq!(e.to_string(), "Error serializing the JSON response");
        let parse_err = serde_json::from_str::<u32>("x").unwrap_err();
        let e: EtlError = Err::<(), _>(parse_err)
            .context(ParsingJsonSnafu {})
            .unwrap_err();
        assert_eq!(e.to_string(), "Error parsing JSON");
    }
}
