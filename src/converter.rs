use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::ConvertError;
use crate::reader::xml_reader::{XmlElement, read_xml_document};
use crate::writer::csv_writer::render_csv;

/// Tag of the elements that become CSV rows.
pub const SAMPLE_TAG: &str = "Sample";

/// Insertion-ordered set of column names.
#[derive(Debug, Clone, Default, PartialEq, Eq,)]
pub struct ColumnSet {
    names: Vec<String,>,
    seen:  HashSet<String,>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name` unless it is already present. Returns whether it was new.
    pub fn insert(&mut self, name: &str,) -> bool {
        if self.seen.contains(name,) {
            return false;
        }
        self.seen.insert(name.to_string(),);
        self.names.push(name.to_string(),);
        true
    }

    pub fn contains(&self, name: &str,) -> bool {
        self.seen.contains(name,)
    }

    pub fn names(&self,) -> &[String] {
        &self.names
    }

    pub fn len(&self,) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self,) -> bool {
        self.names.is_empty()
    }
}

/// Samples reduced to a rectangular table: one row per sample, one cell per
/// column, cells in column order.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct SampleTable {
    pub columns: ColumnSet,
    pub rows:    Vec<Vec<String,>,>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq,)]
pub enum ConversionOutcome {
    Converted { samples: usize, columns: usize, },
    NoSamples,
}

/// Column order for a file: the first sample's child tags in order, then any
/// tag a later sample introduces, in the order it is first met.
pub fn column_order(samples: &[&XmlElement],) -> ColumnSet {
    let mut columns = ColumnSet::new();
    for sample in samples {
        for child in &sample.children {
            columns.insert(&child.tag,);
        }
    }
    columns
}

/// Builds one row for `sample`. When a tag repeats among the sample's
/// children the last one wins; columns without a child stay empty.
pub fn build_row(sample: &XmlElement, columns: &ColumnSet,) -> Vec<String,> {
    let mut fields: HashMap<&str, &str,> = HashMap::new();
    for child in &sample.children {
        fields.insert(child.tag.as_str(), child.text_or_empty(),);
    }
    columns
        .names()
        .iter()
        .map(|name| fields.get(name.as_str(),).copied().unwrap_or_default().to_string(),)
        .collect()
}

/// Collects every `<Sample>` below `root` and lays them out as a table.
/// Returns `None` when the document holds no samples.
pub fn sample_table(root: &XmlElement,) -> Option<SampleTable,> {
    let samples = root.descendants_named(SAMPLE_TAG,);
    if samples.is_empty() {
        return None;
    }

    let columns = column_order(&samples,);
    let rows = samples
        .iter()
        .map(|sample| build_row(sample, &columns,),)
        .collect();
    Some(SampleTable { columns, rows, },)
}

/// Converts one XML file into one CSV file.
///
/// The CSV is rendered in memory and written in one go, so a document that
/// fails to parse or holds no samples leaves nothing behind at `csv_path`.
pub fn convert_file(xml_path: &Path, csv_path: &Path,) -> Result<ConversionOutcome, ConvertError,> {
    let root = read_xml_document(xml_path,)?;

    let Some(table,) = sample_table(&root,) else {
        warn!("No <{}> elements found in {}", SAMPLE_TAG, xml_path.display());
        return Ok(ConversionOutcome::NoSamples,);
    };

    let bytes = render_csv(&table, csv_path,)?;
    fs::write(csv_path, bytes,).map_err(|e| ConvertError::FileWriteError {
        path:   csv_path.to_path_buf(),
        source: e,
    },)?;

    info!(
        "Successfully converted {} to {}",
        xml_path.display(),
        csv_path.display()
    );
    info!("  - Found {} sample(s)", table.rows.len());
    info!("  - Created {} column(s)", table.columns.len());

    Ok(ConversionOutcome::Converted {
        samples: table.rows.len(),
        columns: table.columns.len(),
    },)
}
