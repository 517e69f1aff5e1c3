#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc)]

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;
pub mod timeline;
pub mod ui;
