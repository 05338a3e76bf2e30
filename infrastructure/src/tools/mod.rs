//! Tool assembly
//!
//! Turns the `[tools]` section of a loaded configuration into bound,
//! invokable query tools.

mod tool_set;

pub use tool_set::{CallContext, CallError, ToolSet, ToolSetError};
