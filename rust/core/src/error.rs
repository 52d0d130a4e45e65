// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error taxonomy for parsing, decoding, and graph queries.

use thiserror::Error;

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or querying STEP data
#[derive(Error, Debug)]
pub enum Error {
    /// An unexpected token where a specific one was required. Recovery is
    /// scoped to the current definition; the rest of the file still parses.
    #[error("structural error at byte {offset}: {reason} (near `{context}`)")]
    Structural {
        offset: usize,
        reason: String,
        context: String,
    },

    /// The buffer ended inside a definition. Definitions committed before
    /// the truncation point remain valid.
    #[error("input truncated inside a definition at byte {offset}")]
    Truncated { offset: usize },

    /// A decode helper was invoked against the wrong value kind.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A second `#id=` clause reuses an already-seen instance number.
    /// The first occurrence wins; this is reported, never fatal.
    #[error("duplicate definition for #{id}")]
    DuplicateId { id: u32 },

    /// A graph or resolver query named an instance number with no
    /// definition — a routine condition for partial or filtered exports.
    #[error("unresolved entity reference #{id}")]
    UnresolvedReference { id: u32 },

    /// Token and value indices are 32-bit.
    #[error("input larger than 4 GiB is not supported")]
    TooLarge,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Structural error carrying a context snippet cut from `source`.
    pub fn structural(offset: usize, reason: impl Into<String>, source: &[u8]) -> Self {
        Error::Structural {
            offset,
            reason: reason.into(),
            context: context_snippet(source, offset),
        }
    }

    /// Byte offset of the failure, when the variant carries one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Structural { offset, .. } | Error::Truncated { offset } => Some(*offset),
            _ => None,
        }
    }
}

/// Short window of source text around `offset`, enough to locate the
/// offending clause in the file.
pub fn context_snippet(source: &[u8], offset: usize) -> String {
    const WINDOW: usize = 24;
    let offset = offset.min(source.len());
    let begin = offset.saturating_sub(WINDOW);
    let end = offset.saturating_add(WINDOW).min(source.len());
    String::from_utf8_lossy(&source[begin..end]).replace(['\n', '\r'], " ")
}
