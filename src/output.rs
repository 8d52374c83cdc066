//! Output formatting for search results and parse reports

use crate::index::Platform;
use crate::records::ParseOutcome;
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Open stdout with the requested color mode
pub fn stdout(choice: ColorChoice) -> StandardStream {
    StandardStream::stdout(choice)
}

/// Print platform names found for a location, one per line
pub fn print_platforms<W: WriteColor>(out: &mut W, location: &str, names: &[String]) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)).set_bold(true))?;
    writeln!(out, "{}", location)?;
    out.reset()?;

    for name in names {
        writeln!(out, "  {}", name)?;
    }

    Ok(())
}

/// Print the "nothing covers this location" message
pub fn print_not_found<W: WriteColor>(out: &mut W, location: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
    writeln!(out, "No platforms available for {}", location)?;
    out.reset()
}

/// Print parsed platforms followed by the lines that were skipped
pub fn print_parse_outcome<W: WriteColor>(out: &mut W, outcome: &ParseOutcome) -> io::Result<()> {
    for platform in &outcome.platforms {
        print_platform(out, platform)?;
    }

    if !outcome.skipped.is_empty() {
        writeln!(out)?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        writeln!(out, "Skipped {} line(s):", outcome.skipped.len())?;
        out.reset()?;

        for skipped in &outcome.skipped {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(out, "  {}", skipped.line_number)?;
            out.reset()?;
            writeln!(out, ": {}", skipped.reason)?;
        }
    }

    Ok(())
}

fn print_platform<W: WriteColor>(out: &mut W, platform: &Platform) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
    write!(out, "{}", platform.name())?;
    out.reset()?;
    write!(out, ":")?;

    for (i, location) in platform.locations().enumerate() {
        if i > 0 {
            write!(out, ",")?;
        }
        write!(out, "{}", location)?;
    }

    writeln!(out)
}

/// Print any serializable value as pretty JSON
pub fn print_json(value: &impl Serialize) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)
}
