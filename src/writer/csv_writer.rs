use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::converter::SampleTable;
use crate::error::ConvertError;

/// Serializes a table as comma-separated text: header first, then one record
/// per row, `\r\n` after every record. Fields are quoted only when they hold a
/// comma, a quote or a line break, with embedded quotes doubled.
///
/// `output_path` is only used for error context; nothing is written to disk.
pub fn render_csv(table: &SampleTable, output_path: &Path,) -> Result<Vec<u8,>, ConvertError,> {
    let csv_error = |e: csv::Error| ConvertError::CsvError {
        path:   output_path.to_path_buf(),
        source: e,
    };

    // The csv crate writes a zero-field record as `""`, which reads back as one
    // unnamed column. A table without columns is bare terminators instead.
    if table.columns.is_empty() {
        return Ok(b"\r\n".repeat(table.rows.len() + 1,),);
    }

    let mut writer = WriterBuilder::new()
        .delimiter(b',',)
        .quote(b'"',)
        .quote_style(QuoteStyle::Necessary,)
        .double_quote(true,)
        .terminator(Terminator::CRLF,)
        .from_writer(Vec::new(),);

    writer.write_record(table.columns.names(),).map_err(csv_error,)?;
    for row in &table.rows {
        writer.write_record(row,).map_err(csv_error,)?;
    }

    writer.into_inner().map_err(|e| ConvertError::FileWriteError {
        path:   output_path.to_path_buf(),
        source: std::io::Error::new(e.error().kind(), e.to_string(),),
    },)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ColumnSet;

    fn table(columns: &[&str], rows: &[&[&str]],) -> SampleTable {
        let mut set = ColumnSet::new();
        for column in columns {
            set.insert(column,);
        }
        SampleTable {
            columns: set,
            rows:    rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.to_string(),).collect(),)
                .collect(),
        }
    }

    fn render(table: &SampleTable,) -> String {
        String::from_utf8(render_csv(table, Path::new("out.csv",),).unwrap(),).unwrap()
    }

    #[test]
    fn test_plain_fields_are_unquoted() {
        let t = table(&["Name", "Age"], &[&["Alice", "30"], &["Bob", ""]],);
        assert_eq!(render(&t), "Name,Age\r\nAlice,30\r\nBob,\r\n");
    }

    #[test]
    fn test_special_fields_are_quoted() {
        let t = table(
            &["Note", "Quote", "Lines"],
            &[&["a,b", "say \"hi\"", "one\ntwo"]],
        );
        assert_eq!(
            render(&t),
            "Note,Quote,Lines\r\n\"a,b\",\"say \"\"hi\"\"\",\"one\ntwo\"\r\n"
        );
    }

    #[test]
    fn test_table_without_columns_is_blank_lines() {
        let t = table(&[], &[&[], &[]],);
        assert_eq!(render(&t), "\r\n\r\n\r\n");
    }

    #[test]
    fn test_output_reads_back_identically() {
        let t = table(&["A", "B"], &[&["x,\"y\"", "line\r\nbreak"], &["", "plain"]],);
        let bytes = render_csv(&t, Path::new("out.csv",),).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_slice(),);
        let headers: Vec<String,> = reader.headers().unwrap().iter().map(String::from,).collect();
        assert_eq!(headers, vec!["A", "B"]);
        let rows: Vec<Vec<String,>,> = reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from,).collect(),)
            .collect();
        assert_eq!(rows, t.rows);
    }
}
