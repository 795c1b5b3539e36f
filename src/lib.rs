//! Prebake: Build-Time Optimization Pipeline
//!
//! Runs a catalogue of optimization modules over a static description of an
//! application and emits generated units and resources that let the
//! application skip classpath scanning, condition evaluation, and
//! configuration parsing at startup.

pub mod analyzer;
pub mod artifact;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod model;
pub mod module;
pub mod optimizers;
pub mod pipeline;
pub mod registry;
pub mod sink;
pub mod types;
