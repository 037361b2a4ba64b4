use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use xml_sample_csv::driver::{self, DriverOptions, default_xml_dir};
use xml_sample_csv::error::ConvertError;
use xml_sample_csv::output::OutputFormat;

#[derive(Parser, Debug,)]
#[command(
    author,
    version,
    about = "Converts the <Sample> records of every XML file in a directory into CSV files.",
    long_about = "
    Converts the <Sample> records of every XML file in a directory into CSV files.

    Each <Sample> element becomes one row and each of its direct child elements becomes a \
                  column named after the child's tag. Columns follow the first sample's child \
                  order, then any tag introduced by a later sample. Every file in the input \
                  directory ending in .xml is converted into a same-named .csv file.

    With no arguments the tool reads the 'xml' folder next to the executable and writes into \
                  'xml/csv'.

    Examples:
        # Convert ./xml next to the binary into ./xml/csv
        xml-sample-csv

        # Convert another directory and print a JSON report
        xml-sample-csv --xml-dir ./exports --format json

        # Keep a copy of the log
        xml-sample-csv --log-file convert.log
    "
)]
struct Cli {
    /// Directory holding the XML files [default: <executable dir>/xml]
    #[arg(long, value_name = "DIR")]
    xml_dir: Option<PathBuf,>,

    /// Directory the CSV files are written to [default: <xml-dir>/csv]
    #[arg(long, value_name = "DIR")]
    csv_dir: Option<PathBuf,>,

    /// Format of the final report
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Also write the log to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf,>,
}

fn init_tracing(
    log_file: Option<&Path,>,
) -> Result<Option<WorkerGuard,>, Box<dyn std::error::Error,>,> {
    let (file_layer, guard,) = match log_file {
        Some(path,) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty(),)
                .unwrap_or(Path::new(".",),);
            let file_name = path
                .file_name()
                .ok_or_else(|| format!("Invalid log file path: {}", path.display()),)?
                .to_string_lossy()
                .into_owned();
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER,)
                .filename_prefix(file_name,)
                .build(directory,)?;
            let (non_blocking, guard,) = tracing_appender::non_blocking(appender,);
            (
                Some(fmt::layer().with_writer(non_blocking,).with_ansi(false,),),
                Some(guard,),
            )
        },
        None => (None, None,),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),),)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr,)
                .with_ansi(std::io::stderr().is_terminal(),),
        )
        .with(file_layer,)
        .init();
    Ok(guard,)
}

fn main() -> Result<(), Box<dyn std::error::Error,>,> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref(),)?;

    let xml_dir = match cli.xml_dir {
        Some(dir,) => dir,
        None => default_xml_dir()?,
    };
    let mut options = DriverOptions::for_xml_dir(xml_dir,);
    if let Some(csv_dir,) = cli.csv_dir {
        options = options.with_csv_dir(csv_dir,);
    }

    let report = match driver::run(&options,) {
        Ok(report,) => report,
        Err(e @ ConvertError::MissingInputDirectory { .. },) => {
            error!("Error: {}", e);
            return Ok((),);
        },
        Err(e,) => return Err(Box::new(e,),),
    };

    match cli.format {
        OutputFormat::Text => {
            for line in report.to_string_formatted(OutputFormat::Text,).lines() {
                info!("{}", line);
            }
        },
        format => println!("{}", report.to_string_formatted(format,)),
    }
    Ok((),)
}
