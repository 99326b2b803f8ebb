// Runs the command of a recognized symbol
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, PoisonError};
use std::thread;
use thiserror::Error;

use super::commands::{CommandSpec, CommandTable};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No command for symbol '{0}'")]
    UnknownSymbol(String),
    #[error("Failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Acts on recognized symbols. Returns true if an action was started.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, symbol: &str) -> bool;
}

/// Launches commands as child processes without waiting for them
pub struct ShellDispatcher {
    table: CommandTable,
}

impl ShellDispatcher {
    pub fn new(table: CommandTable) -> Self {
        if table.is_empty() {
            log::warn!("No commands configured, recognized symbols will do nothing");
        } else {
            log::info!("Loaded {} symbol commands", table.len());
        }
        Self { table }
    }

    pub fn execute(&self, symbol: &str) -> Result<(), DispatchError> {
        let spec = self
            .table
            .resolve(symbol)
            .ok_or_else(|| DispatchError::UnknownSymbol(symbol.to_string()))?;

        let child = spawn(spec)?;
        log::info!("Launched '{}' for symbol '{}' (pid {})", spec, symbol, child.id());
        reap(child, spec.to_string());
        Ok(())
    }
}

impl Dispatcher for ShellDispatcher {
    fn dispatch(&self, symbol: &str) -> bool {
        match self.execute(symbol) {
            Ok(()) => true,
            Err(e) => {
                log::error!("{}", e);
                false
            }
        }
    }
}

fn spawn(spec: &CommandSpec) -> Result<Child, DispatchError> {
    Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .spawn()
        .map_err(|source| DispatchError::Spawn {
            command: spec.to_string(),
            source,
        })
}

/// Collect the exit status in the background so no zombie is left behind
fn reap(mut child: Child, command: String) {
    thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => log::warn!("'{}' exited with {}", command, status),
        Ok(_) => log::debug!("'{}' finished", command),
        Err(e) => log::warn!("Failed to wait for '{}': {}", command, e),
    });
}

/// Remembers dispatched symbols instead of running anything
#[derive(Debug, Default)]
pub struct MemoryDispatcher {
    dispatched: Mutex<Vec<String>>,
}

impl MemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Dispatcher for MemoryDispatcher {
    fn dispatch(&self, symbol: &str) -> bool {
        log::info!("Recognized '{}'", symbol);
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(symbol.to_string());
        true
    }
}
