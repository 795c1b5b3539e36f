//! Integration tests for the prebake optimization pipeline

mod cli_export;
mod config_integration;
mod pipeline_run;
mod scheduler_ordering;
mod service_discovery;
mod test_utils;
