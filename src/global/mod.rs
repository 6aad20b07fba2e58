pub mod utils;
pub mod config;
