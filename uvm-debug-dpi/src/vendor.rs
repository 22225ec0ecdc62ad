//! Simulator console primitives, picked at build time.
//!
//! The symbols are resolved when the simulator loads the library, so each
//! vendor module only builds under its own feature.

use uvm_debug_core::{BackendKind, SimulatorConsole};

#[cfg(all(feature = "ncsc", feature = "mentor"))]
compile_error!("features `ncsc` and `mentor` select different simulators; enable only one");

/// The backend this library was built for, with its console primitives.
#[cfg(feature = "ncsc")]
pub fn compiled_console() -> Option<(BackendKind, Box<dyn SimulatorConsole>)> {
    Some((BackendKind::VendorA, Box::new(cfc::CfcConsole)))
}

#[cfg(feature = "mentor")]
pub fn compiled_console() -> Option<(BackendKind, Box<dyn SimulatorConsole>)> {
    Some((BackendKind::VendorB, Box::new(mti::MtiConsole)))
}

#[cfg(not(any(feature = "ncsc", feature = "mentor")))]
pub fn compiled_console() -> Option<(BackendKind, Box<dyn SimulatorConsole>)> {
    None
}

#[cfg(feature = "ncsc")]
mod cfc {
    use libc::c_char;
    use std::ffi::{CStr, CString};
    use uvm_debug_core::SimulatorConsole;
    use uvm_debug_core::error::{BridgeError, BridgeResult};

    unsafe extern "C" {
        fn cfcExecuteCommand(command: *const c_char);
        fn cfcReadline(prompt: *const c_char) -> *const c_char;
    }

    /// Cadence CFC console.
    #[derive(Debug, Default)]
    pub struct CfcConsole;

    impl SimulatorConsole for CfcConsole {
        fn execute(&self, command: &str) -> BridgeResult<()> {
            let command = to_c(command)?;
            unsafe { cfcExecuteCommand(command.as_ptr()) };
            Ok(())
        }

        fn readline(&self, prompt: &str) -> BridgeResult<Option<String>> {
            let prompt = to_c(prompt)?;
            let line = unsafe { cfcReadline(prompt.as_ptr()) };
            if line.is_null() {
                return Ok(None);
            }
            // The simulator owns the returned storage.
            let line = unsafe { CStr::from_ptr(line) };
            Ok(Some(line.to_string_lossy().into_owned()))
        }
    }

    fn to_c(text: &str) -> BridgeResult<CString> {
        CString::new(text).map_err(|_| BridgeError::Console("text contains a NUL byte".into()))
    }
}

#[cfg(feature = "mentor")]
mod mti {
    use libc::{c_char, c_int};
    use std::ffi::{CStr, CString};
    use uvm_debug_core::SimulatorConsole;
    use uvm_debug_core::error::{BridgeError, BridgeResult};

    /// `mti_AskStdin` takes no length, so each read gets a scratch buffer
    /// sized for the longest line the transcript window accepts.
    const MTI_LINE_MAX: usize = 4096;

    unsafe extern "C" {
        fn mti_Cmd(command: *const c_char) -> c_int;
        fn mti_AskStdin(buf: *mut c_char, prompt: *const c_char) -> c_int;
    }

    /// Mentor MTI console.
    #[derive(Debug, Default)]
    pub struct MtiConsole;

    impl SimulatorConsole for MtiConsole {
        fn execute(&self, command: &str) -> BridgeResult<()> {
            let command = to_c(command)?;
            let status = unsafe { mti_Cmd(command.as_ptr()) };
            tracing::trace!(status, "mti_Cmd returned");
            Ok(())
        }

        fn readline(&self, prompt: &str) -> BridgeResult<Option<String>> {
            let prompt = to_c(prompt)?;
            let mut scratch = vec![0u8; MTI_LINE_MAX];
            unsafe { mti_AskStdin(scratch.as_mut_ptr().cast(), prompt.as_ptr()) };
            let line = CStr::from_bytes_until_nul(&scratch)
                .map_err(|_| BridgeError::Console("mti_AskStdin overran its buffer".into()))?;
            Ok(Some(line.to_string_lossy().into_owned()))
        }
    }

    fn to_c(text: &str) -> BridgeResult<CString> {
        CString::new(text).map_err(|_| BridgeError::Console("text contains a NUL byte".into()))
    }
}
