pub mod xml_reader;
