pub mod builder;
pub mod config;
pub mod package;
pub mod source;
pub mod store;
pub mod system;
