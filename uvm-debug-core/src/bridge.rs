use crate::backend::{
    BackendKind, InterpreterBackend, LocalConsole, SimulatorConsole, backend_for,
};
use crate::buffer::{LineBuffer, read_bounded_line, strip_line_ending};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// A bridge shared between the DPI entry points and registered handlers.
pub type SharedBridge = Arc<Mutex<CommandBridge>>;

/// Relays commands to the active interpreter and prompted lines back.
///
/// Owns the line buffer; every successful read or composition overwrites
/// it. Callers get owned copies, never references into the buffer.
pub struct CommandBridge {
    backend: Box<dyn InterpreterBackend>,
    console: LocalConsole,
    status: Box<dyn Write + Send>,
    buffer: LineBuffer,
}

impl std::fmt::Debug for CommandBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBridge")
            .field("backend", &self.backend.kind())
            .field("console", &self.console)
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl CommandBridge {
    /// Diagnostics go to stdout unless replaced with [`CommandBridge::with_status`].
    pub fn new(backend: Box<dyn InterpreterBackend>, console: LocalConsole, capacity: usize) -> Self {
        Self {
            backend,
            console,
            status: Box::new(std::io::stdout()),
            buffer: LineBuffer::new(capacity),
        }
    }

    /// Build from resolved config. `simulator` carries the vendor console
    /// primitives and is required for the vendor backends.
    pub fn from_config(
        config: &BridgeConfig,
        simulator: Option<Box<dyn SimulatorConsole>>,
        console: LocalConsole,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let backend = backend_for(config.backend, simulator)?;
        tracing::info!(backend = %config.backend, capacity = config.capacity, "command bridge ready");
        Ok(Self::new(backend, console, config.capacity))
    }

    pub fn with_status(mut self, status: Box<dyn Write + Send>) -> Self {
        self.status = status;
        self
    }

    pub fn into_shared(self) -> SharedBridge {
        Arc::new(Mutex::new(self))
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Console primitives of a vendor backend. A caller holding the bridge
    /// behind a lock takes these, releases the lock, and then calls them.
    pub fn simulator(&self) -> Option<Arc<dyn SimulatorConsole>> {
        self.backend.simulator()
    }

    /// Run `cmd` in the active interpreter.
    ///
    /// Without an interpreter this writes one diagnostic line to the status
    /// channel and still returns `Ok`. Failures reported by a vendor console
    /// are returned.
    pub fn execute_command(&mut self, cmd: &str) -> BridgeResult<()> {
        match self.backend.run(cmd) {
            Ok(()) => {
                tracing::debug!(backend = %self.backend.kind(), command = cmd, "command forwarded");
                Ok(())
            }
            Err(BridgeError::UnsupportedBackend) => {
                self.report_unsupported();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(command = cmd, error = %e, "simulator rejected command");
                Err(e)
            }
        }
    }

    /// Prompt for one line and return a copy of it.
    ///
    /// Lines of `capacity` bytes or more fail with `InputOverflow`; on any
    /// error the buffer keeps its previous content.
    pub fn read_line(&mut self, prompt: &str) -> BridgeResult<String> {
        let line = if self.backend.can_read() {
            self.backend.read(prompt)?
        } else {
            self.console.prompt(prompt)?;
            read_bounded_line(self.console.input(), self.buffer.capacity())?
        };
        self.store_line(line)
    }

    /// Finish a read whose [`SimulatorConsole::readline`] ran outside the
    /// bridge. Same checks and buffer rules as [`CommandBridge::read_line`].
    pub fn accept_line(&mut self, line: Option<String>) -> BridgeResult<String> {
        match line {
            Some(line) => self.store_line(strip_line_ending(&line).to_string()),
            None => Err(BridgeError::EndOfInput),
        }
    }

    fn store_line(&mut self, line: String) -> BridgeResult<String> {
        if let Err(e) = self.buffer.store(line.clone()) {
            tracing::warn!(error = %e, "simulator console returned an oversized line");
            return Err(e);
        }
        Ok(line)
    }

    /// Copy of the current buffer content.
    pub fn get_buffer(&self) -> String {
        self.buffer.as_str().to_string()
    }

    /// Overwrite the buffer, e.g. with a composed command.
    pub fn set_buffer(&mut self, text: impl Into<String>) -> BridgeResult<()> {
        self.buffer.store(text.into())
    }

    /// Log a command that was run outside the bridge through
    /// [`CommandBridge::simulator`] and report its failure, if any.
    pub fn record_command(&mut self, cmd: &str, result: BridgeResult<()>) {
        match result {
            Ok(()) => {
                tracing::debug!(backend = %self.backend.kind(), command = cmd, "command forwarded");
            }
            Err(e) => {
                tracing::warn!(command = cmd, error = %e, "simulator rejected command");
                self.report_diagnostic(&e.to_string());
            }
        }
    }

    /// Write one human-readable diagnostic line to the status channel.
    pub fn report_diagnostic(&mut self, message: &str) {
        if let Err(e) = writeln!(self.status, "{}", message).and_then(|_| self.status.flush()) {
            tracing::error!(error = %e, "failed to write diagnostic to status channel");
        }
    }

    fn report_unsupported(&mut self) {
        let message = BridgeError::UnsupportedBackend.to_string();
        tracing::warn!(backend = %self.backend.kind(), "{}", message);
        self.report_diagnostic(&message);
    }
}
