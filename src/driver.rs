use std::path::{Path, PathBuf};

use tracing::{error, info};
use walkdir::WalkDir;

use crate::batch_report::{BatchReport, FileOutcome, FileReport};
use crate::converter::convert_file;
use crate::error::ConvertError;

/// Input folder looked up next to the executable.
pub const XML_SUBDIR: &str = "xml";
/// Output folder created inside the input folder.
pub const CSV_SUBDIR: &str = "csv";

const XML_SUFFIX: &str = ".xml";

#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct DriverOptions {
    pub xml_dir: PathBuf,
    pub csv_dir: PathBuf,
}

impl DriverOptions {
    /// Options reading from `xml_dir` and writing into `xml_dir/csv`.
    pub fn for_xml_dir(xml_dir: impl Into<PathBuf,>,) -> Self {
        let xml_dir = xml_dir.into();
        let csv_dir = xml_dir.join(CSV_SUBDIR,);
        Self { xml_dir, csv_dir, }
    }

    pub fn with_csv_dir(mut self, csv_dir: impl Into<PathBuf,>,) -> Self {
        self.csv_dir = csv_dir.into();
        self
    }
}

/// `<directory of the running executable>/xml`.
pub fn default_xml_dir() -> Result<PathBuf, ConvertError,> {
    let exe = std::env::current_exe().map_err(ConvertError::ExecutableLocation,)?;
    let exe_dir = exe.parent().ok_or_else(|| {
        ConvertError::ExecutableLocation(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} has no parent directory", exe.display()),
        ),)
    },)?;
    Ok(exe_dir.join(XML_SUBDIR,),)
}

/// Regular files directly inside `xml_dir` whose name ends in `.xml`, sorted
/// by file name. An entry that cannot be read is logged and left out; only a
/// failure to list `xml_dir` itself is an error.
pub fn discover_xml_files(xml_dir: &Path,) -> Result<Vec<PathBuf,>, ConvertError,> {
    let mut files = Vec::new();
    let walker = WalkDir::new(xml_dir,)
        .min_depth(1,)
        .max_depth(1,)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry,) => entry,
            Err(e,) if e.depth() == 0 => return Err(e.into(),),
            Err(e,) => {
                error!("Error reading directory entry in {}: {}", xml_dir.display(), e);
                continue;
            },
        };
        if !entry.path().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().ends_with(XML_SUFFIX,) {
            files.push(entry.into_path(),);
        }
    }
    Ok(files,)
}

/// Output path for `xml_file`: same stem, `.csv` extension, inside `csv_dir`.
pub fn csv_path_for(xml_file: &Path, csv_dir: &Path,) -> PathBuf {
    let stem = xml_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned(),)
        .unwrap_or_default();
    csv_dir.join(format!("{}.csv", stem),)
}

/// Converts every `*.xml` file in `options.xml_dir`.
///
/// Only a missing input directory, an output directory that cannot be
/// created, or a failed directory listing end the run early; a file that fails
/// to convert is recorded in the report and the batch moves on.
pub fn run(options: &DriverOptions,) -> Result<BatchReport, ConvertError,> {
    if !options.xml_dir.is_dir() {
        return Err(ConvertError::MissingInputDirectory {
            path: options.xml_dir.clone(),
        },);
    }

    std::fs::create_dir_all(&options.csv_dir,).map_err(|e| ConvertError::DirectoryError {
        path:   options.csv_dir.clone(),
        source: e,
    },)?;

    let mut report = BatchReport::new(options.xml_dir.clone(), options.csv_dir.clone(),);
    let xml_files = discover_xml_files(&options.xml_dir,)?;
    if xml_files.is_empty() {
        info!("No XML files found in {}", options.xml_dir.display());
        return Ok(report,);
    }

    info!("Found {} XML file(s) to process", xml_files.len());

    for xml_file in xml_files {
        let csv_file = csv_path_for(&xml_file, &options.csv_dir,);
        info!(
            "Processing: {}",
            xml_file
                .file_name()
                .map(|n| n.to_string_lossy(),)
                .unwrap_or_default()
        );

        let outcome = match convert_file(&xml_file, &csv_file,) {
            Ok(outcome,) => FileOutcome::from(outcome,),
            Err(e,) => {
                if e.is_parse_error() {
                    error!("{}", e);
                } else {
                    error!("Error processing {}: {}", xml_file.display(), e);
                }
                FileOutcome::from(&e,)
            },
        };

        report.files.push(FileReport {
            input: xml_file,
            output: csv_file,
            outcome,
        },);
    }

    Ok(report,)
}
