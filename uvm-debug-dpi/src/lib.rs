//! # uvm-debug DPI
//!
//! C entry points the SystemVerilog `uvm_debug` package imports, plus the
//! command table that lets the simulator console call `debug_prompt`.
//!
//! ```systemverilog
//! import "DPI-C" function void dpi_tcl_exec_cmd(string cmd);
//! import "DPI-C" function void dpi_read_line(string prompt, output string line);
//! import "DPI-C" function void dpi_get_sbuffer(output string line);
//! ```
//!
//! Strings handed back to the caller point into storage owned by this
//! library and stay valid until the next call that returns a line. Copy
//! them if they must outlive that.

mod state;
pub mod vendor;

pub use state::{install, uninstall};

use libc::c_char;
use std::ffi::CStr;
use uvm_debug_core::BridgeError;

/// Run a Tcl command in the simulator.
///
/// # Safety
/// `cmd` must be null or point to a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dpi_tcl_exec_cmd(cmd: *const c_char) {
    let Some(cmd) = (unsafe { from_c(cmd) }) else {
        tracing::warn!("dpi_tcl_exec_cmd called with a null command");
        return;
    };

    run_command(&cmd);
}

/// Prompt for a line on the simulator console (or stdin) and store a
/// pointer to it in `*line`. Failures produce an empty line and a
/// diagnostic on the status channel.
///
/// # Safety
/// `prompt` must be null or point to a NUL-terminated string. `line` must
/// be null or valid for one pointer write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dpi_read_line(prompt: *const c_char, line: *mut *const c_char) {
    let prompt = unsafe { from_c(prompt) }.unwrap_or_default();

    let ptr = match state::with_state(|state| state.bridge.simulator()) {
        Some(simulator) => {
            let read = simulator.readline(&prompt);
            state::with_state(|state| {
                let text = read.and_then(|line| state.bridge.accept_line(line));
                publish_read(state, text)
            })
        }
        None => state::with_state(|state| {
            let text = state.bridge.read_line(&prompt);
            publish_read(state, text)
        }),
    };

    if line.is_null() {
        tracing::warn!("dpi_read_line called without an output pointer");
        return;
    }
    unsafe { *line = ptr };
}

/// Store a pointer to the current buffer content in `*line`.
///
/// # Safety
/// `line` must be null or valid for one pointer write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dpi_get_sbuffer(line: *mut *const c_char) {
    let ptr = state::with_state(|state| {
        let text = state.bridge.get_buffer();
        state.publish(text)
    });

    if line.is_null() {
        tracing::warn!("dpi_get_sbuffer called without an output pointer");
        return;
    }
    unsafe { *line = ptr };
}

/// `debug_prompt` as called from the simulator command table: join the
/// arguments into the buffer and trigger the `uvm_debug` prompt.
///
/// # Safety
/// `args` must be null or point to a null-terminated array of pointers to
/// NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn debug_prompt(args: *const *const c_char) {
    let tokens = unsafe { collect_args(args) };

    let sequence = state::with_state(|state| {
        match state.trigger.begin(&mut state.bridge, tokens.as_slice()) {
            Ok(sequence) => Some(sequence),
            Err(e) => {
                tracing::warn!(error = %e, "debug_prompt failed");
                state.bridge.report_diagnostic(&e.to_string());
                None
            }
        }
    });

    if let Some(sequence) = sequence {
        run_command(sequence);
        state::with_state(|state| state.trigger.complete());
    }
}

/// One entry of the CFC command table.
#[repr(C)]
pub struct CfcEntry {
    pub name: *const c_char,
    pub func: Option<unsafe extern "C" fn(*const *const c_char)>,
}

/// `{ {"debug_prompt", debug_prompt}, {0, 0} }`
#[repr(transparent)]
pub struct CfcTable(pub [CfcEntry; 2]);

// Only ever read; the pointers refer to static data and functions.
unsafe impl Sync for CfcTable {}

/// Commands this library offers the simulator console. Exported as
/// `cfcTable` in Cadence builds, where the loader picks it up by name.
#[cfg_attr(feature = "ncsc", unsafe(export_name = "cfcTable"))]
pub static COMMAND_TABLE: CfcTable = CfcTable([
    CfcEntry {
        name: c"debug_prompt".as_ptr(),
        func: Some(debug_prompt as unsafe extern "C" fn(*const *const c_char)),
    },
    CfcEntry {
        name: std::ptr::null(),
        func: None,
    },
]);

/// Issue `cmd` with the process bridge unlocked for the duration of the
/// simulator call. The command can resume simulation, and SystemVerilog
/// running meanwhile may call back into these exports.
fn run_command(cmd: &str) {
    match state::with_state(|state| state.bridge.simulator()) {
        Some(simulator) => {
            let result = simulator.execute(cmd);
            state::with_state(|state| state.bridge.record_command(cmd, result));
        }
        None => state::with_state(|state| {
            if let Err(e) = state.bridge.execute_command(cmd) {
                state.bridge.report_diagnostic(&e.to_string());
            }
        }),
    }
}

fn publish_read(state: &mut state::DpiState, text: Result<String, BridgeError>) -> *const c_char {
    let text = match text {
        Ok(text) => text,
        Err(e) => {
            report_read_failure(&mut state.bridge, &e);
            String::new()
        }
    };
    state.publish(text)
}

fn report_read_failure(bridge: &mut uvm_debug_core::CommandBridge, error: &BridgeError) {
    match error {
        BridgeError::EndOfInput => tracing::info!("input closed while reading a line"),
        other => tracing::warn!(error = %other, "read_line failed"),
    }
    bridge.report_diagnostic(&error.to_string());
}

unsafe fn from_c(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(ptr) };
    Some(text.to_string_lossy().into_owned())
}

unsafe fn collect_args(args: *const *const c_char) -> Vec<String> {
    let mut tokens = Vec::new();
    if args.is_null() {
        return tokens;
    }
    let mut index = 0;
    loop {
        let arg = unsafe { *args.add(index) };
        match unsafe { from_c(arg) } {
            Some(token) => tokens.push(token),
            None => break,
        }
        index += 1;
    }
    tokens
}
