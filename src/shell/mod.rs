//! Shell-level state and OS integration: variables, call frames, options,
//! the process and job tables, terminal control, and the trap registry.

pub mod job;
pub mod os;
pub mod process;
pub mod state;
pub mod trap;

pub use job::Job;
pub use process::Process;
pub use state::{
    Branch, CallFrame, Function, ShellOptions, ShellState, Variable,
    VAR_ATTRIB_EXPORT, VAR_ATTRIB_NONE, VAR_ATTRIB_READONLY,
};
