use std::path::PathBuf;

#[derive(Debug, thiserror::Error,)]
pub enum ConvertError {
    #[error("Error parsing XML file {path}: {source}")]
    ParseError {
        path:   PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync,>,
    },
    #[error("File not found or could not be read: {path} - {source}")]
    FileReadError {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not write output file {path}: {source}")]
    FileWriteError {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error serializing CSV for {path}: {source}")]
    CsvError {
        path:   PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Could not create directory {path}: {source}")]
    DirectoryError {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error walking directory: {0}")]
    WalkError(#[from] walkdir::Error,),
    #[error("XML directory '{path}' does not exist")]
    MissingInputDirectory { path: PathBuf, },
    #[error("Could not locate the running executable: {0}")]
    ExecutableLocation(#[source] std::io::Error,),
}

impl ConvertError {
    /// Builds a [`ConvertError::ParseError`] from a plain message.
    pub fn malformed(path: impl Into<PathBuf,>, message: impl Into<String,>,) -> Self {
        ConvertError::ParseError {
            path:   path.into(),
            source: message.into().into(),
        }
    }

    /// True when the input was not well-formed XML, as opposed to an I/O or
    /// serialization failure.
    pub fn is_parse_error(&self,) -> bool {
        matches!(self, ConvertError::ParseError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_is_parse_error() {
        let err = ConvertError::malformed("broken.xml", "no element found",);
        assert!(err.is_parse_error());
        assert_eq!(
            err.to_string(),
            "Error parsing XML file broken.xml: no element found"
        );
    }

    #[test]
    fn test_io_errors_are_not_parse_errors() {
        let err = ConvertError::FileWriteError {
            path:   PathBuf::from("out.csv",),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied",),
        };
        assert!(!err.is_parse_error());
    }
}
