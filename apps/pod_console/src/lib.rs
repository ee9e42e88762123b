//! Pod details view model and the shell state it drives.

pub mod config;
pub mod controller;
pub mod shell;
