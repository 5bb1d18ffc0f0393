pub mod app;
pub mod changes;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod export;
pub mod models;
pub mod paths;
pub mod providers;
pub mod service;
pub mod storage;
pub mod util;

#[cfg(test)]
pub(crate) mod fixtures;
