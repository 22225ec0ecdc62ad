//! Interpreter backends.
//!
//! The bridge talks to exactly one backend, picked once at startup. Vendor
//! backends forward to a host-supplied [`SimulatorConsole`]; the native and
//! unsupported backends have no command primitive and leave line reads to
//! the bridge's [`LocalConsole`].

use crate::buffer::strip_line_ending;
use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::str::FromStr;
use std::sync::Arc;

/// Which interpreter the bridge is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// No simulator console; prompts go to stdout and lines come from stdin.
    #[default]
    Native,
    /// Cadence CFC console (`cfcExecuteCommand` / `cfcReadline`).
    VendorA,
    /// Mentor MTI console (`mti_Cmd` / `mti_AskStdin`).
    VendorB,
    /// Unknown simulator.
    Unsupported,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Native => "native",
            BackendKind::VendorA => "vendor_a",
            BackendKind::VendorB => "vendor_b",
            BackendKind::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "stdin" | "console" => Ok(BackendKind::Native),
            "vendor_a" | "ncsc" | "cadence" => Ok(BackendKind::VendorA),
            "vendor_b" | "mentor" | "questa" => Ok(BackendKind::VendorB),
            "unsupported" | "none" => Ok(BackendKind::Unsupported),
            other => anyhow::bail!("unknown interpreter backend '{}'", other),
        }
    }
}

/// Command and line-read primitives supplied by the simulator.
///
/// Either call may resume simulation, and the resumed simulation may call
/// back into the bridge before the primitive returns. Callers must not hold
/// a lock on the bridge across them.
pub trait SimulatorConsole: Send + Sync {
    /// Run one Tcl command in the simulator.
    fn execute(&self, command: &str) -> BridgeResult<()>;

    /// Prompt on the simulator console and return the entered line, or
    /// `None` once the console has no more input.
    fn readline(&self, prompt: &str) -> BridgeResult<Option<String>>;
}

/// Strategy object the Command Bridge dispatches through.
pub trait InterpreterBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Run `command` in the interpreter. Backends without a command
    /// primitive return [`BridgeError::UnsupportedBackend`].
    fn run(&mut self, command: &str) -> BridgeResult<()>;

    /// Whether [`InterpreterBackend::read`] is available. When it is not,
    /// the bridge reads from its local console instead.
    fn can_read(&self) -> bool {
        false
    }

    fn read(&mut self, _prompt: &str) -> BridgeResult<String> {
        Err(BridgeError::UnsupportedBackend)
    }

    /// The simulator primitives behind this backend, if any, so they can be
    /// called after the bridge itself has been unlocked.
    fn simulator(&self) -> Option<Arc<dyn SimulatorConsole>> {
        None
    }
}

/// Plain stdin/stdout operation, no Tcl console attached.
#[derive(Debug, Default)]
pub struct NativeConsole;

impl InterpreterBackend for NativeConsole {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn run(&mut self, _command: &str) -> BridgeResult<()> {
        Err(BridgeError::UnsupportedBackend)
    }
}

/// Placeholder for simulators the bridge has no integration for.
#[derive(Debug, Default)]
pub struct NoBackend;

impl InterpreterBackend for NoBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Unsupported
    }

    fn run(&mut self, _command: &str) -> BridgeResult<()> {
        Err(BridgeError::UnsupportedBackend)
    }
}

/// A simulator console reached through vendor primitives.
pub struct VendorBackend {
    kind: BackendKind,
    console: Arc<dyn SimulatorConsole>,
}

impl fmt::Debug for VendorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VendorBackend")
            .field("kind", &self.kind)
            .field("console", &"Arc<dyn SimulatorConsole>")
            .finish()
    }
}

impl VendorBackend {
    /// Cadence flavour (`VendorA`).
    pub fn vendor_a(console: Box<dyn SimulatorConsole>) -> Self {
        Self {
            kind: BackendKind::VendorA,
            console: Arc::from(console),
        }
    }

    /// Mentor flavour (`VendorB`).
    pub fn vendor_b(console: Box<dyn SimulatorConsole>) -> Self {
        Self {
            kind: BackendKind::VendorB,
            console: Arc::from(console),
        }
    }
}

impl InterpreterBackend for VendorBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn run(&mut self, command: &str) -> BridgeResult<()> {
        self.console.execute(command)
    }

    fn can_read(&self) -> bool {
        true
    }

    fn read(&mut self, prompt: &str) -> BridgeResult<String> {
        match self.console.readline(prompt)? {
            Some(line) => Ok(strip_line_ending(&line).to_string()),
            None => Err(BridgeError::EndOfInput),
        }
    }

    fn simulator(&self) -> Option<Arc<dyn SimulatorConsole>> {
        Some(Arc::clone(&self.console))
    }
}

/// Build the backend for `kind`. Vendor kinds need the simulator's console
/// primitives; without them the bridge cannot reach the interpreter.
pub fn backend_for(
    kind: BackendKind,
    console: Option<Box<dyn SimulatorConsole>>,
) -> anyhow::Result<Box<dyn InterpreterBackend>> {
    let backend: Box<dyn InterpreterBackend> = match (kind, console) {
        (BackendKind::Native, _) => Box::new(NativeConsole),
        (BackendKind::Unsupported, _) => Box::new(NoBackend),
        (BackendKind::VendorA, Some(console)) => Box::new(VendorBackend::vendor_a(console)),
        (BackendKind::VendorB, Some(console)) => Box::new(VendorBackend::vendor_b(console)),
        (kind, None) => anyhow::bail!("backend '{}' requires simulator console primitives", kind),
    };
    Ok(backend)
}

/// The local prompt/read channel used when the backend cannot read lines.
pub struct LocalConsole {
    input: Box<dyn BufRead + Send>,
    output: Box<dyn Write + Send>,
}

impl fmt::Debug for LocalConsole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalConsole")
            .field("input", &"Box<dyn BufRead + Send>")
            .field("output", &"Box<dyn Write + Send>")
            .finish()
    }
}

impl LocalConsole {
    pub fn new(input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self { input, output }
    }

    /// Process stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(
            Box::new(BufReader::new(std::io::stdin())),
            Box::new(std::io::stdout()),
        )
    }

    /// Write the prompt and flush so it shows before the read blocks.
    pub fn prompt(&mut self, prompt: &str) -> BridgeResult<()> {
        self.output.write_all(prompt.as_bytes())?;
        self.output.flush()?;
        Ok(())
    }

    pub fn input(&mut self) -> &mut (dyn BufRead + Send) {
        &mut *self.input
    }
}

impl Default for LocalConsole {
    fn default() -> Self {
        Self::stdio()
    }
}
