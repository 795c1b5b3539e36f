//! Configuration sources, applied in precedence order by the loader.

pub mod config_file;
pub mod environment;
