use clap::Parser;

/// Normalizes municipal indicator files (SNIS, FINBRA, IBGE, IPEADATA) and ranks
/// the municipalities by positional index.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON job description: source type, files and output settings.
    /// Relative file paths are resolved against the directory of this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, repeatable) An input file. Setting this option overrides the files that may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Vec<String>,

    /// The source type of the inputs: SNIS, FINBRA, IBGE_PIB, IBGE_CEMPRE or IPEADATA.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default 1) The 1-based index of the header row, for files that start with a preamble.
    #[clap(long, value_parser)]
    pub first_row_index: Option<usize>,

    /// (default: the first worksheet) When using a spreadsheet, the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the result. Setting this option overrides the
    /// path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference CSV output. If provided, munietl checks that the computed output
    /// matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed as an argument, writes the JSON response of the worker instead of the CSV file.
    #[clap(long, takes_value = false)]
    pub json: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
