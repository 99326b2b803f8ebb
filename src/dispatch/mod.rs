// Dispatch module
// Maps recognized symbols to shell commands and launches them

pub mod commands;
pub mod executor;

pub use commands::{CommandSpec, CommandTable};
pub use executor::{DispatchError, Dispatcher, MemoryDispatcher, ShellDispatcher};
