//! dupctl: concurrent duplicate-file scanner and resolver.
//!
//! Walks one or more trees, fingerprints file content, groups files with
//! identical digests, selects a survivor per group, and applies an
//! operator-chosen resolution action behind a safety gate, with an audit
//! trail and optional resume-on-interrupt.

pub mod action;
pub mod arg_parser;
pub mod audit;
pub mod cache;
pub mod config_file;
pub mod digest;
pub mod disk_detect;
pub mod engine;
pub mod error;
pub mod gate;
pub mod grouper;
pub mod hashing;
pub mod keeper;
pub mod pathutil;
pub mod pipeline;
pub mod reports;
pub mod resume;
pub mod similarity;
pub mod types;
pub mod utils;

pub use digest::{Algorithm, Digest, DigestTag};
pub use error::ReasonCode;
pub use types::{
    ActionKind, ActionOutcome, CachedDigest, DigestGroup, FileRecord, KeepDecision, KeepStrategy,
    ResumePoint, RunConfig, RunSummary,
};
