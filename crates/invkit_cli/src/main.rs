//! `invkit`: exports equipment inventory reports per organizational scope.
//!
//! Reads units, item catalog, and inventory counts from PostgreSQL (or an IPC
//! snapshot directory) and writes one workbook tree under `--output-dir`.

mod args;

use std::process::ExitCode;

use clap::Parser;
use invkit_io_db::{PgInventorySource, SnapshotInventorySource};
use invkit_io_xlsx::{SpecXlsxWriteOptions, XlsxWorkbookSink};
use invkit_report::{InventorySource, ReportAssembler, ReportError, ReportRun};
use tracing::{error, info};

use crate::args::{Cli, format_scope_errors};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(report) => {
            println!("{report}");
            for c_line in format_scope_errors(&report.errors) {
                eprintln!("{c_line}");
            }
            if report.error_count() > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ReportRun, ReportError> {
    let source: Box<dyn InventorySource> = match &cli.path_dir_snapshot {
        Some(path_dir) => {
            info!("reading snapshot `{}`", path_dir.display());
            Box::new(SnapshotInventorySource::open(path_dir)?)
        }
        None => Box::new(PgInventorySource::connect(&cli.to_db_connection())?),
    };
    let sink = XlsxWorkbookSink::new(&cli.path_dir_out, SpecXlsxWriteOptions::default());
    let assembler = ReportAssembler::new(cli.to_report_options());

    info!("writing reports to `{}`", cli.path_dir_out.display());
    assembler.run(source.as_ref(), &sink)
}
