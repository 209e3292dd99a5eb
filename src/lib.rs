pub mod cli;
pub mod commands;
pub mod hssp;
pub mod utils;
