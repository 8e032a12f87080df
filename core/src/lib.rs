pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod runner;
pub mod util;
