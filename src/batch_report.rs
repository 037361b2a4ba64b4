use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::converter::ConversionOutcome;
use crate::error::ConvertError;
use crate::output::OutputFormat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Converted { samples: usize, columns: usize, },
    NoSamples,
    ParseFailed { message: String, },
    ProcessingFailed { message: String, },
}

impl From<ConversionOutcome,> for FileOutcome {
    fn from(outcome: ConversionOutcome,) -> Self {
        match outcome {
            ConversionOutcome::Converted { samples, columns, } => {
                FileOutcome::Converted { samples, columns, }
            },
            ConversionOutcome::NoSamples => FileOutcome::NoSamples,
        }
    }
}

impl From<&ConvertError,> for FileOutcome {
    fn from(err: &ConvertError,) -> Self {
        if err.is_parse_error() {
            FileOutcome::ParseFailed {
                message: err.to_string(),
            }
        } else {
            FileOutcome::ProcessingFailed {
                message: err.to_string(),
            }
        }
    }
}

impl FileOutcome {
    pub fn is_failure(&self,) -> bool {
        matches!(
            self,
            FileOutcome::ParseFailed { .. } | FileOutcome::ProcessingFailed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct FileReport {
    pub input:   PathBuf,
    pub output:  PathBuf,
    pub outcome: FileOutcome,
}

/// Everything one pass over an XML directory did, file by file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize,)]
pub struct BatchReport {
    pub xml_dir: PathBuf,
    pub csv_dir: PathBuf,
    pub files:   Vec<FileReport,>,
}

#[derive(Serialize,)]
struct ReportSummary<'a,> {
    xml_dir:         &'a PathBuf,
    csv_dir:         &'a PathBuf,
    discovered:      usize,
    converted:       usize,
    without_samples: usize,
    failed:          usize,
    files:           &'a [FileReport],
}

impl BatchReport {
    pub fn new(xml_dir: PathBuf, csv_dir: PathBuf,) -> Self {
        Self {
            xml_dir,
            csv_dir,
            files: Vec::new(),
        }
    }

    pub fn discovered(&self,) -> usize {
        self.files.len()
    }

    pub fn converted(&self,) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Converted { .. }),)
            .count()
    }

    pub fn without_samples(&self,) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome == FileOutcome::NoSamples,)
            .count()
    }

    pub fn failed(&self,) -> usize {
        self.files.iter().filter(|f| f.outcome.is_failure(),).count()
    }

    fn summary(&self,) -> ReportSummary<'_,> {
        ReportSummary {
            xml_dir:         &self.xml_dir,
            csv_dir:         &self.csv_dir,
            discovered:      self.discovered(),
            converted:       self.converted(),
            without_samples: self.without_samples(),
            failed:          self.failed(),
            files:           &self.files,
        }
    }

    pub fn to_string_formatted(&self, format: OutputFormat,) -> String {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(&self.summary(),)
                .unwrap_or_else(|e| format!("Error serializing report to JSON: {}", e),),
            OutputFormat::Yaml => serde_yaml::to_string(&self.summary(),)
                .unwrap_or_else(|e| format!("Error serializing report to YAML: {}", e),),
            OutputFormat::Text => {
                let mut output = String::new();
                for file in &self.files {
                    let name = file
                        .input
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned(),)
                        .unwrap_or_else(|| file.input.display().to_string(),);
                    let line = match &file.outcome {
                        FileOutcome::Converted { samples, columns, } => format!(
                            "{}: converted to {} ({} sample(s), {} column(s))",
                            name,
                            file.output.display(),
                            samples,
                            columns
                        ),
                        FileOutcome::NoSamples => format!("{}: no <Sample> elements, skipped", name),
                        FileOutcome::ParseFailed { message, }
                        | FileOutcome::ProcessingFailed { message, } => {
                            format!("{}: failed - {}", name, message)
                        },
                    };
                    output.push_str(&line,);
                    output.push('\n',);
                }
                output.push_str(&format!(
                    "{} XML file(s) found, {} converted, {} without samples, {} failed",
                    self.discovered(),
                    self.converted(),
                    self.without_samples(),
                    self.failed()
                ),);
                output
            },
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result {
        write!(f, "{}", self.to_string_formatted(OutputFormat::Text))
    }
}
