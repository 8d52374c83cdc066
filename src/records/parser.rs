//! Line-oriented platform record parser
//!
//! Each line is `<name>:<location>,<location>,...`. Only the first `:`
//! separates the name; anything after it belongs to the location list.
//! Malformed lines are skipped and reported, they never fail the parse.

use crate::error::{RecordError, Result};
use crate::index::Platform;
use ahash::AHashMap;
use serde::Serialize;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// A line left out of the parse result
#[derive(Debug, Clone, Serialize)]
pub struct SkippedLine {
    /// 1-based line number
    pub line_number: usize,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: RecordError,
}

/// Platforms parsed from one input plus the lines that were dropped
#[derive(Debug, Default, Serialize)]
pub struct ParseOutcome {
    pub platforms: Vec<Platform>,
    pub skipped: Vec<SkippedLine>,
}

/// Parse platform records, merging lines that share a name
///
/// Returns distinct-by-name platforms. Only an I/O error on `reader` fails
/// the call; bad lines are skipped.
pub fn parse_records<R: BufRead>(reader: R) -> Result<Vec<Platform>> {
    parse_records_with_report(reader).map(|outcome| outcome.platforms)
}

/// Open and parse a records file
pub fn parse_file(path: &Path) -> Result<ParseOutcome> {
    let file = File::open(path)?;
    parse_records_with_report(BufReader::new(file))
}

/// Like [`parse_records`], also returning the skipped lines
pub fn parse_records_with_report<R: BufRead>(mut reader: R) -> Result<ParseOutcome> {
    let mut merger = RecordMerger::default();
    let mut skipped = Vec::new();
    let mut buf = Vec::new();
    let mut line_number = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_number += 1;

        let line = decode_line(&buf);
        if line.trim().is_empty() {
            debug!(line = line_number, "skipped empty line");
            continue;
        }

        if let Err(reason) = merger.apply(&line) {
            warn!(line = line_number, content = %line, %reason, "skipped record");
            skipped.push(SkippedLine {
                line_number,
                reason,
            });
        }
    }

    let platforms = merger.finish();
    info!(
        platforms = platforms.len(),
        skipped = skipped.len(),
        "parsed platform records"
    );

    Ok(ParseOutcome { platforms, skipped })
}

/// Split one non-blank line into a trimmed name and its locations
pub fn parse_line(line: &str) -> std::result::Result<(&str, Vec<&str>), RecordError> {
    let (name, locations) = line
        .split_once(':')
        .ok_or(RecordError::MissingSeparator)?;

    let name = name.trim();
    if name.is_empty() {
        return Err(RecordError::EmptyName);
    }

    let locations: Vec<&str> = locations
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if locations.is_empty() {
        return Err(RecordError::NoLocations);
    }

    Ok((name, locations))
}

/// Accumulates platforms by name in first-seen order
#[derive(Default)]
struct RecordMerger {
    platforms: Vec<Platform>,
    by_name: AHashMap<String, usize>,
}

impl RecordMerger {
    fn apply(&mut self, line: &str) -> std::result::Result<(), RecordError> {
        let (name, locations) = parse_line(line)?;

        match self.by_name.get(name).copied() {
            Some(slot) => {
                self.platforms[slot].extend_locations(locations)?;
                debug!(platform = name, "merged locations");
            }
            None => {
                let platform = Platform::new(name, locations)?;
                self.by_name.insert(name.to_string(), self.platforms.len());
                self.platforms.push(platform);
                debug!(platform = name, "added platform");
            }
        }

        Ok(())
    }

    fn finish(self) -> Vec<Platform> {
        self.platforms
    }
}

/// Decode a raw line, dropping the line terminator
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}

fn serialize_reason<S: serde::Serializer>(
    reason: &RecordError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    fn parse(content: &str) -> Vec<Platform> {
        parse_records(Cursor::new(content.as_bytes())).unwrap()
    }

    #[test]
    fn test_valid_file() {
        let platforms = parse("Яндекс.Директ:/ru\nГазета уральских москвичей:/ru/msk,/ru/permobl");
        assert_eq!(platforms.len(), 2);
        assert!(
            platforms
                .iter()
                .any(|p| p.name() == "Яндекс.Директ" && p.has_location("/ru"))
        );
    }

    #[test]
    fn test_invalid_lines_are_skipped() {
        let platforms = parse("\n\n:InvalidLine\nNoColonHere");
        assert!(platforms.is_empty());
    }

    #[test]
    fn test_duplicate_names_merge() {
        let platforms = parse("Тест:/ru\nТест:/ru/msk\nТест:/ru");
        assert_eq!(platforms.len(), 1);

        let platform = &platforms[0];
        assert_eq!(platform.location_count(), 2);
        assert!(platform.has_location("/ru"));
        assert!(platform.has_location("/ru/msk"));
    }

    #[test]
    fn test_only_first_colon_splits() {
        let platforms = parse("Portal: /a:b , /c");
        assert_eq!(platforms.len(), 1);
        assert!(platforms[0].has_location("/a:b"));
        assert!(platforms[0].has_location("/c"));
    }

    #[test]
    fn test_names_and_locations_are_trimmed() {
        let platforms = parse("  Ревдинский рабочий : /ru/svrd/revda , , /ru/svrd/pervik \r\n");
        assert_eq!(platforms.len(), 1);
        assert_eq!(platforms[0].name(), "Ревдинский рабочий");
        assert_eq!(
            platforms[0].locations().collect::<Vec<_>>(),
            vec!["/ru/svrd/pervik", "/ru/svrd/revda"]
        );
    }

    #[test]
    fn test_report_lists_skipped_lines() {
        let input = "A:/ru\nno separator\n :/ru\nB: , \n\nC:/ru/msk";
        let outcome = parse_records_with_report(Cursor::new(input.as_bytes())).unwrap();

        assert_eq!(outcome.platforms.len(), 2);
        let reasons: Vec<_> = outcome
            .skipped
            .iter()
            .map(|s| (s.line_number, s.reason.clone()))
            .collect();
        assert_eq!(
            reasons,
            vec![
                (2, RecordError::MissingSeparator),
                (3, RecordError::EmptyName),
                (4, RecordError::NoLocations),
            ]
        );
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut input = b"A:/ru/".to_vec();
        input.push(0xff);
        let platforms = parse_records(Cursor::new(input)).unwrap();
        assert_eq!(platforms.len(), 1);
        assert!(platforms[0].has_location("/ru/\u{fffd}"));
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("A:/x,/y").unwrap(), ("A", vec!["/x", "/y"]));
        assert_eq!(parse_line("A"), Err(RecordError::MissingSeparator));
        assert_eq!(parse_line(" :/x"), Err(RecordError::EmptyName));
        assert_eq!(parse_line("A: ,,"), Err(RecordError::NoLocations));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream closed"))
        }
    }

    #[test]
    fn test_stream_failure_aborts() {
        let reader = io::BufReader::new(Cursor::new(b"A:/ru\n".to_vec()).chain(FailingReader));
        let result = parse_records(reader);
        assert!(matches!(result, Err(crate::error::Error::Stream(_))));
    }
}
