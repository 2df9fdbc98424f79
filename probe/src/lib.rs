//! ejabberd admin API smoke tests
//!
//! Mints an HS256 token for a test user and walks the HTTP admin API with
//! Basic and Bearer credentials, returning a typed outcome per probe.

pub mod client;
pub mod commands;
pub mod config;
pub mod outcome;
pub mod suite;

pub use client::{AdminClient, ApiError, ClientError, Credentials, ProbeFailure, ProbeResponse};
pub use config::{ProbeConfig, JWK_ENV};
pub use outcome::{Expectation, ProbeOutcome, ProbeReport, ProbeResult, Verdict};
pub use suite::{names, tamper_signature, ProbeSuite};
