//! Crafting cost and profit scanner for the World of Warcraft auction house.

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod util;

pub use error::{Error, Result};
