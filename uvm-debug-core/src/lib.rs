//! # uvm-debug core
//!
//! The Command Bridge between a simulator's Tcl console (or plain
//! stdin/stdout) and the `uvm_debug` interactive prompt.

pub mod backend;
pub mod bridge;
pub mod buffer;
pub mod config;
pub mod error;
pub mod registry;
pub mod telemetry;
pub mod trigger;

// Re-export the main types so users can just use `uvm_debug_core::CommandBridge`
pub use backend::{BackendKind, InterpreterBackend, LocalConsole, SimulatorConsole};
pub use bridge::{CommandBridge, SharedBridge};
pub use config::BridgeConfig;
pub use error::{BridgeError, RegistryError};
pub use registry::{CommandHandler, CommandRegistry, HandlerTable};
pub use trigger::{TriggerHandler, TriggerState};
