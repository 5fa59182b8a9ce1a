pub mod backend;
pub mod chart;
pub mod chart_options;
pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod query;
pub mod session;
pub mod timestamp;

#[cfg(test)]
mod tests;
