//! Malicious URL detection: canonicalize a URL, extract lexical features,
//! short-circuit trusted domains and score the rest with a tree ensemble.

pub mod canonical;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod labels;
pub mod model;
pub mod routes;
pub mod schema;
pub mod types;
pub mod whitelist;
