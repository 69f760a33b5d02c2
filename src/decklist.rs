//! Plain-text card list files (`.dec`).
//!
//! Every non-empty line that is not a `//` comment reads `<count> <name>`.
//! Lines whose count does not parse are logged and skipped; the rest of the
//! file is still read.

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{error, info, warn};

use crate::config::LIST_EXTENSION;
use crate::error::Result;
use crate::models::DeckEntry;

const COMMENT_PREFIX: &str = "//";

/// Why a list line could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListLineError {
    #[error("missing card name")]
    MissingName,
    #[error("invalid card count '{0}'")]
    InvalidCount(String),
}

/// Parse one list line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> std::result::Result<Option<(i64, &str)>, ListLineError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
        return Ok(None);
    }
    let (count, name) = line.split_once(' ').ok_or(ListLineError::MissingName)?;
    let count = count
        .parse::<i64>()
        .map_err(|_| ListLineError::InvalidCount(count.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ListLineError::MissingName);
    }
    Ok(Some((count, name)))
}

/// Read every entry of a list, calling `on_entry(count, name)` in file order.
///
/// Lines that are not valid UTF-8 are decoded lossily and a warning is
/// logged; they never stop the rest of the list from being read.
pub fn read_list<R: BufRead>(mut reader: R, source: &str, mut on_entry: impl FnMut(i64, &str)) -> Result<()> {
    let mut buf = Vec::new();
    let mut index = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        index += 1;
        let line = String::from_utf8_lossy(&buf);
        if let Cow::Owned(_) = line {
            warn!("Line {} of {} is not valid UTF-8.", index, source);
        }
        match parse_line(&line) {
            Ok(Some((count, name))) => on_entry(count, name),
            Ok(None) => {}
            Err(e) => error!("Unable to read line {} of {}: {}", index, source, e),
        }
    }
}

pub fn read_list_file(path: &Path, on_entry: impl FnMut(i64, &str)) -> Result<()> {
    info!("Reading list file at '{}'.", path.display());
    let file = File::open(path)?;
    let source = path.display().to_string();
    read_list(BufReader::new(file), &source, on_entry)
}

/// The list files a path stands for: the file itself, or every `.dec` file
/// directly inside a directory. An empty result means nothing to import.
pub fn list_sources(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_file()
            && entry_path.extension().and_then(|e| e.to_str()) == Some(LIST_EXTENSION)
        {
            files.push(entry_path);
        }
    }
    files.sort();
    Ok(files)
}

/// Write a deck list: a header comment with the total and a timestamp, then
/// one `<count> <name>` line per card.
pub fn write_deck_list<W: Write>(mut out: W, deck: &[DeckEntry], total: usize) -> Result<()> {
    writeln!(
        out,
        "{} Deck with {} cards - {}",
        COMMENT_PREFIX,
        total,
        Local::now().format("%a %b %d %H:%M:%S %Y")
    )?;
    for entry in deck {
        writeln!(out, "{} {}", entry.copies, entry.card.name)?;
    }
    out.flush()?;
    Ok(())
}
