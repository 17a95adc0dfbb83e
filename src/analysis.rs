use log::{debug, info, warn};

use coded_survey::*;
use snafu::{prelude::*, Snafu};

use std::path::Path;

use text_diff::print_diff;

use crate::analysis::config_reader::*;
use crate::analysis::io_charts::write_charts;
use crate::analysis::io_csv::{read_table, table_to_string, write_table};
use crate::analysis::io_jsonl::read_records;
use crate::analysis::io_schemes::SchemeRegistry;
use crate::analysis::pipelines::Pipeline;
use crate::args::Args;

mod config_reader;
mod io_charts;
mod io_common;
mod io_csv;
mod io_jsonl;
mod io_schemes;
mod pipelines;

#[derive(Debug, Snafu)]
pub enum CliError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error parsing line {lineno} of {path}"))]
    ParsingJsonLine {
        source: serde_json::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error writing {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error in CSV file {path}"))]
    Csv { source: csv::Error, path: String },
    #[snafu(display("Analysis failed: {source}"))]
    Analysis { source: AnalysisError },
    #[snafu(display(
        "Unknown pipeline {name}: expected kakuma_pipeline or dadaab_pipeline"
    ))]
    UnknownPipeline { name: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CliResult<T> = Result<T, CliError>;

/// Reads the inputs named by `args`, runs the analysis and writes its tables
/// and charts.
pub fn run_pipeline(args: &Args) -> CliResult<()> {
    let config = read_config(&args.config)?;
    info!("config: {:?}", config);
    let settings = config.analysis_settings()?;
    let pipeline = Pipeline::from_name(&config.pipeline_name)?;

    let mut registry = SchemeRegistry::new(Path::new(&args.code_schemes));
    let plans = pipeline.plans(&mut registry)?;
    info!(
        "Loaded {} code schemes for the {} pipeline",
        registry.len(),
        pipeline.camp()
    );

    let messages = read_records(&args.messages)?;
    let individuals = read_records(&args.individuals)?;

    let report =
        run_analysis(&messages, &individuals, &plans, &settings).context(AnalysisSnafu {})?;

    let out_dir = Path::new(&args.out_dir);
    io_common::ensure_dir(out_dir)?;
    let tables = report.tables();
    for (stem, table) in tables.iter() {
        let path = io_common::output_path(out_dir, stem, "csv");
        write_table(&path, &io_common::blank_repeated_first_column(table))?;
        debug!("{}: digest {}", stem, table.digest());
    }
    write_charts(&out_dir.join("graphs"), &report, &settings)?;

    // The reference tables, if provided for comparison
    if let Some(reference) = &args.reference {
        check_reference(Path::new(reference), &tables)?;
    }

    info!("Wrote the analysis of the {} pipeline to {}", pipeline.camp(), args.out_dir);
    Ok(())
}

fn check_reference(reference_dir: &Path, tables: &[(&'static str, Table)]) -> CliResult<()> {
    let mut mismatches: Vec<&str> = Vec::new();
    for (stem, table) in tables.iter() {
        let path = io_common::output_path(reference_dir, stem, "csv");
        let reference = table_to_string(&read_table(&path)?)?;
        let computed = table_to_string(&io_common::blank_repeated_first_column(table))?;
        if reference != computed {
            warn!("Found differences with the reference table {}", stem);
            print_diff(reference.as_str(), computed.as_str(), "\n");
            mismatches.push(*stem);
        }
    }
    if !mismatches.is_empty() {
        whatever!(
            "Difference detected between calculated tables and reference tables: {}",
            mismatches.join(", ")
        )
    }
    Ok(())
}
