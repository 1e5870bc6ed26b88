//! Core handler infrastructure: the handler trait, its context and the
//! registry dispatching commands and menu buttons.

pub mod context;
pub mod registry;

pub use context::{Context, Handler};
pub use registry::Registry;
