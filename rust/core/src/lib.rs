// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # STEP-Lite Core
//!
//! High-performance parser and in-memory index for ISO-10303-21 "STEP
//! physical file" exchange text — the syntax underlying CAD/BIM
//! interchange formats such as IFC.
//!
//! ## Overview
//!
//! - **Tokenization**: zero-copy byte spans classified through 256-entry
//!   lookup tables, with [memchr](https://docs.rs/memchr)-accelerated
//!   string and comment skipping
//! - **Value store**: one flat, append-only tagged-value array per
//!   document; nested lists are contiguous `(first, count)` runs
//! - **Definition table**: `#id = NAME(...);` clauses in file order, with
//!   per-definition error recovery and truncation tolerance
//! - **Graph / Resolver**: derived forward/inverse id-reference adjacency,
//!   or a light `id → definition` index for spot lookups
//!
//! ## Quick Start
//!
//! ```rust
//! use step_lite_core::{Document, Graph};
//!
//! let content = "#1=IFCCARTESIANPOINT((0.,0.,0.));\n#2=IFCWALL('guid',$,*,#1);";
//! let doc = Document::parse_str(content).unwrap();
//!
//! let wall = &doc.definitions()[1];
//! assert_eq!(doc.entity_name(wall), "IFCWALL");
//!
//! let graph = Graph::build(&doc);
//! assert_eq!(graph.relations(2).unwrap(), &[1]);
//! assert_eq!(graph.inverse_relations(1).unwrap(), &[2]);
//! ```
//!
//! ## Performance
//!
//! - Parsing one file is single-threaded and strictly sequential; the
//!   parallel unit is one [`Document`] per file ([`parse_files`])
//! - Number decoding uses [fast-float](https://docs.rs/fast-float) and
//!   [lexical-core](https://docs.rs/lexical-core), materialized only on
//!   demand
//! - File input is memory-mapped so tokenization starts after a single
//!   bulk I/O step
//!
//! ## Feature Flags
//!
//! - `serde`: enable serialization support for summary types

pub mod document;
pub mod error;
pub mod graph;
pub mod header;
pub mod parallel;
pub mod printer;
pub mod resolver;
pub mod token;
pub mod value;

mod decode;

pub use document::{Definition, Diagnostic, Document};
pub use error::{Error, Result};
pub use graph::{DuplicateId, Graph};
pub use header::HeaderInfo;
pub use parallel::parse_files;
pub use printer::{definition_to_string, value_to_string, write_definition, write_value};
pub use resolver::Resolver;
pub use token::{should_store, token_type_of, Token, TokenType, Tokenizer};
pub use value::{EncoderScratch, RawValue, ValueEncoder, ValueKind};
