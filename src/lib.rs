//! A toolkit for reading, validating, optimizing, and rewriting PDF files:
//! merge, split, trim, extract pages/images/fonts/content, watermark,
//! manage embedded file attachments, and encrypt/decrypt, all on top of a
//! shared `Document` object model.

#![forbid(unsafe_code)]
#![deny(clippy::all)]

#[macro_use]
mod object;
mod datetime;
pub use crate::object::{Dictionary, Object, ObjectId, Stream};

mod document;
mod object_stream;
pub mod xref;
pub use crate::document::Document;

pub mod commands;
pub mod config;
pub use crate::config::Config;
mod encodings;
pub mod encryption;
mod error;
pub use error::XrefError;
pub mod filters;
mod optimizer;
pub use crate::optimizer::{optimize, OptimizationReport};
mod page_selection;
pub use crate::page_selection::pages_for;
mod parser;
mod reader;
mod stats;
pub use crate::stats::Stats;
mod validator;
pub use crate::validator::{validate, ValidationIssue, ValidationReport};
mod writer;

pub use error::{Error, Result};
