// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HEADER section metadata.
//!
//! Extracts FILE_DESCRIPTION, FILE_NAME, and FILE_SCHEMA from the HEADER
//! section using [nom](https://docs.rs/nom). The header grammar is tiny —
//! quoted strings, string lists, and `$` — and independent of the entity
//! tokenizer. Extraction is tolerant: a missing or malformed header
//! yields `None`, never an error, since the DATA section stands on its
//! own.

use memchr::memmem;
use nom::{
    branch::alt,
    character::complete::char,
    combinator::map,
    multi::separated_list0,
    sequence::{delimited, preceded},
    IResult,
};

/// Metadata from the three mandatory HEADER entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeaderInfo {
    /// FILE_DESCRIPTION: view definitions and remarks
    pub description: Vec<String>,
    /// FILE_DESCRIPTION: implementation level, e.g. `2;1`
    pub implementation_level: String,
    /// FILE_NAME: exchange structure name
    pub name: String,
    /// FILE_NAME: timestamp, as spelled in the file
    pub time_stamp: String,
    /// FILE_NAME: authors
    pub authors: Vec<String>,
    /// FILE_NAME: organizations
    pub organizations: Vec<String>,
    /// FILE_NAME: preprocessor version
    pub preprocessor_version: String,
    /// FILE_NAME: originating system
    pub originating_system: String,
    /// FILE_NAME: authorization
    pub authorization: String,
    /// FILE_SCHEMA: schema identifiers, e.g. `IFC4`
    pub schema_identifiers: Vec<String>,
}

/// One argument of a header entry.
enum HeaderValue {
    Str(String),
    List(Vec<String>),
}

/// Skip whitespace
fn ws(input: &str) -> IResult<&str, ()> {
    let trimmed = input.trim_start();
    Ok((trimmed, ()))
}

/// Parse a single-quoted string literal; `''` escapes a quote
fn quoted(input: &str) -> IResult<&str, &str> {
    fn content(input: &str) -> IResult<&str, &str> {
        let bytes = input.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                    i += 2;
                    continue;
                }
                return Ok((&input[i..], &input[..i]));
            }
            i += 1;
        }
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }

    delimited(char('\''), content, char('\''))(input)
}

/// Parse `('a','b')` into its strings
fn string_list(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        preceded(ws, char('(')),
        separated_list0(
            preceded(ws, char(',')),
            preceded(ws, map(quoted, String::from)),
        ),
        preceded(ws, char(')')),
    )(input)
}

/// Parse one argument: a string, a string list, or `$`
fn header_value(input: &str) -> IResult<&str, HeaderValue> {
    preceded(
        ws,
        alt((
            map(quoted, |s| HeaderValue::Str(s.to_string())),
            map(string_list, HeaderValue::List),
            map(char('$'), |_| HeaderValue::Str(String::new())),
        )),
    )(input)
}

/// Parse an entry's parenthesized argument list
fn arguments(input: &str) -> IResult<&str, Vec<HeaderValue>> {
    delimited(
        preceded(ws, char('(')),
        separated_list0(preceded(ws, char(',')), header_value),
        preceded(ws, char(')')),
    )(input)
}

/// Arguments of `keyword(...)` within the header section, if present.
fn entry_arguments(section: &str, keyword: &str) -> Option<Vec<HeaderValue>> {
    let at = section.find(keyword)?;
    let rest = &section[at + keyword.len()..];
    arguments(rest).ok().map(|(_, values)| values)
}

fn string_at(values: &[HeaderValue], index: usize) -> String {
    match values.get(index) {
        Some(HeaderValue::Str(s)) => s.clone(),
        _ => String::new(),
    }
}

fn list_at(values: &[HeaderValue], index: usize) -> Vec<String> {
    match values.get(index) {
        Some(HeaderValue::List(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Extract header metadata from a raw buffer. The section is located
/// before the first `#`, so a multi-gigabyte DATA section is never
/// scanned for it.
pub(crate) fn extract(src: &[u8]) -> Option<HeaderInfo> {
    let window_end = memchr::memchr(b'#', src).unwrap_or(src.len());
    let begin = memmem::find(&src[..window_end], b"HEADER;")?;
    let end = begin + memmem::find(&src[begin..], b"ENDSEC;")?;
    let section = std::str::from_utf8(&src[begin..end]).ok()?;

    let mut info = HeaderInfo::default();
    if let Some(values) = entry_arguments(section, "FILE_DESCRIPTION") {
        info.description = list_at(&values, 0);
        info.implementation_level = string_at(&values, 1);
    }
    if let Some(values) = entry_arguments(section, "FILE_NAME") {
        info.name = string_at(&values, 0);
        info.time_stamp = string_at(&values, 1);
        info.authors = list_at(&values, 2);
        info.organizations = list_at(&values, 3);
        info.preprocessor_version = string_at(&values, 4);
        info.originating_system = string_at(&values, 5);
        info.authorization = string_at(&values, 6);
    }
    if let Some(values) = entry_arguments(section, "FILE_SCHEMA") {
        info.schema_identifiers = list_at(&values, 0);
    }
    Some(info)
}
