pub mod client;
pub mod config;
pub mod domain;
pub mod logging;
pub mod report;
pub mod run;
pub mod summary;
