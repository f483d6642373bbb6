pub mod cmd;
pub mod config;
pub mod logger;
pub mod render;
pub mod util;
