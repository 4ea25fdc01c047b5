//! Capture-date metadata.
//!
//! Text watermarks with no content fall back to the date the photo was
//! taken (EXIF `DateTimeOriginal`), or today's date when the photo does
//! not carry one.

use std::io::Cursor;

use chrono::{Local, NaiveDate, NaiveDateTime};

/// Format used for date watermarks.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// EXIF timestamp layout (`YYYY:MM:DD HH:MM:SS`).
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Date the photo in `bytes` was taken, if it carries a parseable EXIF
/// `DateTimeOriginal`.
#[must_use]
pub fn capture_date(bytes: &[u8]) -> Option<NaiveDate> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    match &field.value {
        exif::Value::Ascii(values) => values
            .iter()
            .find_map(|raw| parse_exif_datetime(&String::from_utf8_lossy(raw))),
        _ => None,
    }
}

/// Parse an EXIF timestamp into its date.
#[must_use]
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    NaiveDateTime::parse_from_str(trimmed, EXIF_DATETIME_FORMAT)
        .ok()
        .map(|dt| dt.date())
}

/// Text to draw: `content` if non-empty, else the capture date, else
/// today (local time), formatted `YYYY-MM-DD`.
#[must_use]
pub fn watermark_text(content: &str, capture: Option<NaiveDate>) -> String {
    if !content.is_empty() {
        return content.to_owned();
    }
    capture
        .unwrap_or_else(|| Local::now().date_naive())
        .format(DATE_FORMAT)
        .to_string()
}
