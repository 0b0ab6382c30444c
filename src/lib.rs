//! Case configuration compiler for ELM land-surface runs.
//!
//! A sparse run request is resolved into a fully determined scenario, compiled
//! into `xmlchange` directives, namelist overrides, and stream-file edits, and
//! then driven through an ordered case lifecycle ending in submission.
pub mod case;
pub mod cli;
pub mod directives;
pub mod edit;
pub mod error;
pub mod lifecycle;
pub mod namelist;
pub mod resolve;
pub mod settings;
pub mod staging;
pub mod streams;
pub mod submit;
pub mod toolchain;
pub mod workflow;

#[cfg(test)]
mod test_support;
