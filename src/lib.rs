pub mod analysis;
pub mod cache;
pub mod config;
pub mod errors;
pub mod farcaster;
pub mod llm;
pub mod logging;
pub mod models;

#[cfg(test)]
pub mod tests;

#[cfg(test)]
mod config_tests;
#[cfg(test)]
mod metrics_tests;

pub use config::AppConfig;
pub use errors::*;
