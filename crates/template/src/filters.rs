//! Template filters
//!
//! Markdown conversion and date handling for page templates.
//!
//! Dates are accepted as strings in any of the common forms a page or data
//! file carries them in (RFC 3339, RFC 2822, `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]`).
//! Dates without an offset are taken to be UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use minijinja::{Error, ErrorKind, Value};
use pulldown_cmark::{Options, Parser, html};
use std::fmt::Write;

/// Format used by `format_date` when none is given
pub const DEFAULT_DATE_FORMAT: &str = "%B %d, %Y";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y"];

/// Convert markdown text to HTML
///
/// Tables, footnotes, strikethrough and heading attributes are enabled.
pub fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

    let parser = Parser::new_ext(text, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

/// Render markdown to HTML
///
/// Usage: `{{ page.body | markdown }}`
///
/// The result is marked safe so auto-escaping leaves the HTML intact.
pub fn markdown(value: &str) -> Value {
    Value::from_safe_string(markdown_to_html(value))
}

/// Parse a date string
///
/// # Errors
///
/// Returns an error message if no supported format matches
pub fn parse_date_str(value: &str) -> Result<DateTime<FixedOffset>, String> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Ok(dt);
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    for format in DATE_FORMATS {
        if let Some(midnight) = NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(midnight.and_utc().fixed_offset());
        }
    }

    Err(format!("unrecognized date: {value:?}"))
}

fn parse(value: &str) -> Result<DateTime<FixedOffset>, Error> {
    parse_date_str(value).map_err(|msg| Error::new(ErrorKind::InvalidOperation, msg))
}

/// Normalise a date string to RFC 3339
///
/// Usage: `{{ page.date | parse_date }}`
///
/// # Errors
///
/// Returns error if the date cannot be parsed
pub fn parse_date(value: &str) -> Result<String, Error> {
    Ok(parse(value)?.to_rfc3339())
}

/// Format a date with a strftime-style format string
///
/// Usage: `{{ page.date | format_date }}` or `{{ page.date | format_date("%Y") }}`
///
/// # Errors
///
/// Returns error if the date cannot be parsed or the format is invalid
pub fn format_date(value: &str, format: Option<&str>) -> Result<String, Error> {
    let dt = parse(value)?;
    let format = format.unwrap_or(DEFAULT_DATE_FORMAT);

    let mut out = String::new();
    write!(out, "{}", dt.format(format)).map_err(|_| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid date format: {format:?}"),
        )
    })?;
    Ok(out)
}

/// Format a date as RFC 2822, as RSS `pubDate` expects
///
/// Usage: `{{ page.date | rfc2822_date }}`
///
/// # Errors
///
/// Returns error if the date cannot be parsed
pub fn rfc2822_date(value: &str) -> Result<String, Error> {
    Ok(parse(value)?.to_rfc2822())
}
