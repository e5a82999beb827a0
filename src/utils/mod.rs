pub mod config;
pub mod file_utils;
pub mod logger;
