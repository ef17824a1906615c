//! Command-line front end for the token price proxy

pub mod cli;
pub mod commands;

pub use cli::{Args, Command, Family};
