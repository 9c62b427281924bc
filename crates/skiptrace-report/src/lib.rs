pub mod csv_sink;
pub mod text;

pub use csv_sink::CsvResultSink;
