// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Multi-file parsing.
//!
//! Parsing one file is strictly sequential; the parallelism boundary is
//! one document per file. A root document plus its linked reference
//! documents parse concurrently with no shared mutable state.

use crate::document::Document;
use crate::error::Result;
use rayon::prelude::*;
use std::path::Path;

/// Parse several STEP files concurrently, one isolated [`Document`] per
/// file. Results preserve input order and each file fails or succeeds on
/// its own.
pub fn parse_files<P>(paths: &[P]) -> Vec<Result<Document>>
where
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|path| Document::parse_path(path.as_ref()))
        .collect()
}
