//! Canonical types for the sequence toolchain
//!
//! This crate defines the data that the rest of the toolchain moves around:
//!
//! - **SeqDocument**: the canonical JSON model a sequence compiles to and is
//!   generated from. Field names and nesting are a compatibility surface and
//!   must not drift.
//! - **CommandDictionary**: the read-only lookup structure mapping command
//!   stems to ordered, typed argument definitions. The toolchain consumes
//!   dictionaries, it never produces or mutates them.
//! - **Diagnostic**: the uniform carrier for every problem the toolchain can
//!   report. Nothing in the core throws; problems travel as data with a
//!   source span attached.
//!
//! Everything here is plain data: no I/O, no interior mutability.

#![deny(unsafe_code)]

mod diag;
mod dict;
mod seq;

pub use diag::*;
pub use dict::*;
pub use seq::*;
