use log::{debug, info, LevelFilter};

use std::path::{Path, PathBuf};

use clap::Parser;
use snafu::{prelude::*, ErrorCompat};

mod args;
mod etl;

use crate::etl::config_reader::*;
use crate::etl::{EtlResult, MissingParentDirSnafu, RunOutput};

/// Resolves a path of the configuration file against its directory.
fn resolve(root: &Path, p: &str) -> String {
    root.join(p).display().to_string()
}

/// Combines the job file (if any) with the command line flags. The flags take precedence.
fn build_job(args: &args::Args) -> EtlResult<(JobConfig, PathBuf, RunOutput)> {
    let (mut job, root) = match args.config.as_deref() {
        Some(config_path) => {
            let job = read_job_config(config_path)?;
            let root = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (job, root)
        }
        None => {
            let source_type = match args.input_type.clone() {
                Some(x) => x,
                None => whatever!("No source type given: use --input-type or --config"),
            };
            let job = JobConfig {
                source_type,
                file_sources: vec![],
                output_settings: OutputSettings::default(),
            };
            (job, PathBuf::new())
        }
    };

    let mut output = RunOutput {
        out: job
            .output_settings
            .output_path
            .as_deref()
            .map(|p| resolve(&root, p)),
        reference: job
            .output_settings
            .reference_path
            .as_deref()
            .map(|p| resolve(&root, p)),
        json: args.json,
    };
    if args.out.is_some() {
        output.out = args.out.clone();
    }
    if args.reference.is_some() {
        output.reference = args.reference.clone();
    }

    if let Some(source_type) = args.input_type.clone() {
        job.source_type = source_type;
    }

    // Files given on the command line are relative to the working directory.
    let root = if args.input.is_empty() {
        root
    } else {
        job.file_sources = args.input.iter().map(|p| FileSource::new(p)).collect();
        PathBuf::new()
    };

    if args.first_row_index.is_some() || args.excel_worksheet_name.is_some() {
        job.file_sources = job
            .file_sources
            .into_iter()
            .map(|fs| {
                let fs = match args.first_row_index {
                    Some(x) => fs.with_first_row_index(Some(x)),
                    None => fs,
                };
                match args.excel_worksheet_name.clone() {
                    Some(name) => fs.with_excel_worksheet_name(Some(name)),
                    None => fs,
                }
            })
            .collect();
    }

    debug!("build_job: {:?} root: {:?} output: {:?}", job, root, output);
    Ok((job, root, output))
}

fn main() {
    let args = args::Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
    debug!("args: {:?}", args);

    let res = build_job(&args).and_then(|(job, root, output)| etl::run_job(&job, &root, &output));

    if let Err(e) = res {
        eprintln!("An error occured: {}", e);
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = std::error::Error::source(cause);
        }
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
    info!("Done");
}
