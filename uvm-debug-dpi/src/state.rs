//! The process-wide bridge behind the DPI entry points.
//!
//! DPI imports are free functions, so the bridge lives in a static. The
//! simulator calls in from its single control thread; the mutex only keeps
//! that assumption from turning into undefined behaviour.
//!
//! The lock is never held across a simulator primitive: those can resume
//! simulation, which calls straight back into the exports on the same
//! thread.

use crate::vendor;
use libc::c_char;
use std::ffi::CString;
use std::sync::{Mutex, MutexGuard};
use uvm_debug_core::backend::NativeConsole;
use uvm_debug_core::telemetry::init_tracing;
use uvm_debug_core::{BridgeConfig, CommandBridge, LocalConsole, TriggerHandler};

static STATE: Mutex<Option<DpiState>> = Mutex::new(None);

pub(crate) struct DpiState {
    pub(crate) bridge: CommandBridge,
    pub(crate) trigger: TriggerHandler,
    /// Last string handed to C. Replaced on every publish.
    line: CString,
}

impl DpiState {
    fn new(bridge: CommandBridge) -> Self {
        Self {
            bridge,
            trigger: TriggerHandler::new(),
            line: CString::default(),
        }
    }

    /// First DPI call: resolve config and wire up the compiled-in backend.
    fn from_env() -> Self {
        init_tracing();

        let mut config = BridgeConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %format!("{:#}", e), "using default bridge config");
            BridgeConfig::default()
        });

        let simulator = vendor::compiled_console().map(|(kind, console)| {
            config.backend = kind;
            console
        });

        let bridge = CommandBridge::from_config(&config, simulator, LocalConsole::stdio())
            .unwrap_or_else(|e| {
                tracing::warn!(error = %format!("{:#}", e), "falling back to the native console");
                CommandBridge::new(Box::new(NativeConsole), LocalConsole::stdio(), config.capacity)
            });

        Self::new(bridge)
    }

    /// Hand `text` to C as a NUL-terminated string. The pointer stays valid
    /// until the next publish.
    pub(crate) fn publish(&mut self, text: String) -> *const c_char {
        let text = if text.contains('\0') {
            text.replace('\0', "")
        } else {
            text
        };
        self.line = CString::new(text).unwrap_or_default();
        self.line.as_ptr()
    }
}

fn lock() -> MutexGuard<'static, Option<DpiState>> {
    STATE.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("DPI bridge lock poisoned; continuing with last state");
        poisoned.into_inner()
    })
}

/// Run `f` against the process bridge, creating it on first use.
pub(crate) fn with_state<T>(f: impl FnOnce(&mut DpiState) -> T) -> T {
    let mut guard = lock();
    let state = guard.get_or_insert_with(DpiState::from_env);
    f(state)
}

/// Replace the process bridge, e.g. to wire in a custom simulator console.
pub fn install(bridge: CommandBridge) {
    *lock() = Some(DpiState::new(bridge));
}

/// Remove the process bridge and return it. The next DPI call builds a
/// fresh one from the environment.
pub fn uninstall() -> Option<CommandBridge> {
    lock().take().map(|state| state.bridge)
}
