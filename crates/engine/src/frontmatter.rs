//! TOML front matter
//!
//! A page may open with a TOML table fenced by `+++` lines:
//!
//! ```text
//! +++
//! title = "Hello"
//! date = 2021-03-04
//! +++
//! <h1>{{ title }}</h1>
//! ```
//!
//! The table becomes per-page data; everything after the closing fence is
//! the template.

use crate::error::{Error, Result};
use jssg_config::variables::parse_toml_table;
use jssg_core::path::RelPath;
use serde_json::{Map, Value};

const FENCE: &str = "+++";

/// Split `source` into its front matter and body
///
/// Returns `None` unless the source opens with a fence line and a closing
/// fence line follows.
pub fn split(source: &str) -> Option<(&str, &str)> {
    let rest = source.strip_prefix(FENCE)?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parse the front matter of `input`
///
/// Sources without front matter yield an empty table and the whole source.
///
/// # Errors
///
/// Returns an error if the fenced block is not valid TOML
pub fn parse(input: &RelPath, source: &str) -> Result<(Map<String, Value>, String)> {
    let Some((front, body)) = split(source) else {
        return Ok((Map::new(), source.to_string()));
    };

    let data = parse_toml_table(front)
        .map_err(|e| Error::other(format!("Invalid front matter in {input}"), e))?;
    Ok((data.into_iter().collect(), body.to_string()))
}
