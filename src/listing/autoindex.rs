// src/listing/autoindex.rs
// =============================================================================
// This module turns an autoindex directory page into records.
//
// The repository manager renders directories as plain HTML where every
// child is one line:
//
//   <a href="NAME">NAME</a>       22-Aug-2019 09:53  2.50 MB
//
// We don't need a full HTML parser for that. Each line starting with the
// anchor-open token is split on fixed delimiters:
// 1. `">` separates the href from the rest           -> exactly 2 parts
// 2. `</a>` separates the link text from the metadata -> exactly 2 parts
// 3. The metadata splits into 3 fields from the right -> timestamp, size, unit
//
// A line that starts like an anchor but fails a split is a hard error. The
// listing format has changed and guessing would record wrong metadata.
// =============================================================================

use crate::error::{Result, WalkError};
use crate::walk::is_reserved_name;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::Lines;
use tracing::warn;

const ANCHOR_OPEN: &str = "<a href=\"";
const HREF_CLOSE: &str = "\">";
const ANCHOR_CLOSE: &str = "</a>";
const METADATA_FIELDS: usize = 3;

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoindexEntry {
    /// The literal href, trailing `/` included for directories
    pub name: String,
    /// Date and time as printed by the server, e.g. "22-Aug-2019 09:53"
    #[serde(rename = "api_ts")]
    pub timestamp: String,
    #[serde(rename = "h_size")]
    pub size: String,
    #[serde(rename = "h_unit")]
    pub unit: String,
}

/// Lazy iterator over the entries of one page, in document order.
///
/// Cloning it restarts nothing; calling `parse` again on the same text does.
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    lines: Lines<'a>,
}

// Parses a listing page lazily
//
// Lines that don't start with the anchor token (HTML boilerplate, blank
// lines, trailing text) are skipped. Parent-directory links are skipped too.
//
// Example:
//   parse("<a href=\"a.txt\">a.txt</a>  22-Aug-2019 09:53  2.50 MB")
//   yields AutoindexEntry { name: "a.txt", timestamp: "22-Aug-2019 09:53", .. }
pub fn parse(page_text: &str) -> Entries<'_> {
    Entries {
        lines: page_text.lines(),
    }
}

// Parses a whole page, stopping at the first malformed line
pub fn parse_all(page_text: &str) -> Result<Vec<AutoindexEntry>> {
    parse(page_text).collect()
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<AutoindexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            let trimmed = line.trim_start();
            if !trimmed.starts_with(ANCHOR_OPEN) {
                continue;
            }
            match parse_line(trimmed) {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

// Parses one anchor line
//
// Returns Ok(None) for parent-directory links, which carry no metadata.
fn parse_line(line: &str) -> Result<Option<AutoindexEntry>> {
    let rest = &line[ANCHOR_OPEN.len()..];

    let (href, rest) = split_pair(line, rest, HREF_CLOSE)?;
    if is_parent_link(href) {
        return Ok(None);
    }

    let (_text, trailing) = split_pair(line, rest, ANCHOR_CLOSE)?;

    let fields = rsplit_whitespace(trailing.trim(), METADATA_FIELDS);
    if fields.len() != METADATA_FIELDS {
        return Err(WalkError::MalformedListing {
            line: line.to_string(),
            expected: METADATA_FIELDS,
            actual: fields.len(),
        });
    }

    Ok(Some(AutoindexEntry {
        name: href.to_string(),
        timestamp: fields[0].to_string(),
        size: fields[1].to_string(),
        unit: fields[2].to_string(),
    }))
}

// Splits `text` once on `delimiter`, failing with a 2-vs-1 field count
fn split_pair<'t>(line: &str, text: &'t str, delimiter: &str) -> Result<(&'t str, &'t str)> {
    text.split_once(delimiter)
        .ok_or_else(|| WalkError::MalformedListing {
            line: line.to_string(),
            expected: 2,
            actual: 1,
        })
}

fn is_parent_link(href: &str) -> bool {
    href == ".." || href == "../"
}

// Splits on whitespace from the right into at most `max` fields
//
// The leftmost field keeps its inner whitespace, so the date and time of
// "22-Aug-2019 09:53  2.50 MB" stay together as one field.
fn rsplit_whitespace(text: &str, max: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max);
    let mut rest = text;

    while fields.len() + 1 < max {
        let Some((idx, ch)) = rest.char_indices().rev().find(|(_, c)| c.is_whitespace()) else {
            break;
        };
        fields.push(&rest[idx + ch.len_utf8()..]);
        rest = rest[..idx].trim_end();
    }
    if !rest.is_empty() {
        fields.push(rest);
    }

    fields.reverse();
    fields
}

/// A parsed directory page: child names in listing order plus their rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub edges: Vec<String>,
    pub entries: HashMap<String, AutoindexEntry>,
}

impl Listing {
    // Builds a listing from page text
    //
    // A name listed twice keeps its first position and first row. Names
    // that clash with the snapshot's record keys are dropped.
    pub fn from_page(page_text: &str) -> Result<Self> {
        let mut listing = Listing::default();
        for entry in parse(page_text) {
            let entry = entry?;
            if is_reserved_name(&entry.name) {
                warn!(name = %entry.name, "Dropping child named like a snapshot key");
                continue;
            }
            if listing.entries.contains_key(&entry.name) {
                continue;
            }
            listing.edges.push(entry.name.clone());
            listing.entries.insert(entry.name.clone(), entry);
        }
        Ok(listing)
    }

    pub fn metadata(&self, name: &str) -> Option<&AutoindexEntry> {
        self.entries.get(name)
    }
}
