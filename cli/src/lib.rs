//! gpgdrive-cli library, exposes the command handlers for tests.

pub mod app;
pub mod commands;
