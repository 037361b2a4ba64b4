//! Turns the `<Sample>` records of XML documents into CSV tables, one table
//! per document and one row per sample.

pub mod batch_report;
pub mod converter;
pub mod driver;
pub mod error;
pub mod output;
pub mod reader;
pub mod writer;
