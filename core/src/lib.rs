pub mod api;
pub mod automaton;
pub mod channel;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod keys;
pub mod runner;
pub mod task;
pub mod util;
