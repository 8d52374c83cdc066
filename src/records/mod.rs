pub mod parser;

pub use parser::{
    parse_file, parse_line, parse_records, parse_records_with_report, ParseOutcome, SkippedLine,
};
