mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{GridOverrides, build_config};
