//! Core data models and the command builder

mod command_builder;
mod lab_options;

pub use command_builder::*;
pub use lab_options::*;
