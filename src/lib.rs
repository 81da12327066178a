pub mod config;
pub mod kernel;
pub mod logging;
pub mod models;
pub mod parser;
pub mod paths;
