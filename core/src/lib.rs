pub mod compare;
pub mod config;
pub mod context;
pub mod host;
pub mod judge;
pub mod lang;
pub mod partition;
pub mod protocol;
pub mod runner;
pub mod session;
pub mod template;
pub mod verdict;

pub use crate::config::Config;
