//! The `debug_prompt` command.
//!
//! Typed in the simulator console, `debug_prompt <tokens...>` leaves the
//! tokens in the bridge buffer for the `uvm_debug` prompt to pick up, then
//! steps one delta cycle, raises the trigger flag, breaks on it and resumes.

use crate::backend::BackendKind;
use crate::bridge::{CommandBridge, SharedBridge};
use crate::error::{BridgeResult, RegistryError};
use crate::registry::CommandRegistry;

/// Name the handler registers under in the host's command table.
pub const DEBUG_PROMPT_COMMAND: &str = "debug_prompt";

/// Simulation variable the verification environment waits on.
pub const TRIGGER_OBJECT: &str = "uvm_debug.trigger_prompt";

/// Delta step, deposit the trigger, break once on it, resume.
pub const TRIGGER_SEQUENCE: &str = "run -delta 1; deposit uvm_debug.trigger_prompt 1; stop -delbreak 1 -object uvm_debug.trigger_prompt; run";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerState {
    #[default]
    Idle,
    CommandIssued,
}

/// Join tokens the way the prompt expects them: each followed by one space.
pub fn compose_command<S: AsRef<str>>(args: &[S]) -> String {
    let mut composed = String::new();
    for arg in args {
        composed.push_str(arg.as_ref());
        composed.push(' ');
    }
    composed
}

#[derive(Debug, Default)]
pub struct TriggerHandler {
    state: TriggerState,
}

impl TriggerHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// Store the composed tokens in the buffer and issue the trigger
    /// sequence once. A composition that does not fit the buffer fails with
    /// `InputOverflow` before anything is sent to the simulator.
    pub fn invoke<S: AsRef<str>>(
        &mut self,
        bridge: &mut CommandBridge,
        args: &[S],
    ) -> BridgeResult<()> {
        let sequence = self.begin(bridge, args)?;
        let result = bridge.execute_command(sequence);
        self.complete();
        result
    }

    /// First half of [`TriggerHandler::invoke`]: compose into the buffer and
    /// return the sequence to issue. The caller runs it, typically through
    /// [`CommandBridge::simulator`] with the bridge unlocked, then calls
    /// [`TriggerHandler::complete`].
    pub fn begin<S: AsRef<str>>(
        &mut self,
        bridge: &mut CommandBridge,
        args: &[S],
    ) -> BridgeResult<&'static str> {
        let composed = compose_command(args);
        bridge.set_buffer(composed)?;

        if bridge.backend_kind() != BackendKind::VendorA {
            tracing::debug!(
                backend = %bridge.backend_kind(),
                "trigger sequence uses Cadence console syntax"
            );
        }

        self.state = TriggerState::CommandIssued;
        Ok(TRIGGER_SEQUENCE)
    }

    pub fn complete(&mut self) {
        self.state = TriggerState::Idle;
    }

    /// Register a fresh handler under [`DEBUG_PROMPT_COMMAND`]. The host
    /// gets no result back; failures are logged.
    ///
    /// The shared bridge is unlocked while a vendor simulator runs the
    /// sequence, so the resumed simulation can reach the bridge.
    pub fn register<R>(registry: &mut R, bridge: SharedBridge) -> Result<(), RegistryError>
    where
        R: CommandRegistry + ?Sized,
    {
        let mut handler = TriggerHandler::new();
        registry.register_command(
            DEBUG_PROMPT_COMMAND,
            Box::new(move |args: &[String]| {
                let (sequence, simulator) = {
                    let Ok(mut guard) = bridge.lock() else {
                        tracing::error!("{}", RegistryError::LockPoisoned);
                        return;
                    };
                    match handler.begin(&mut guard, args) {
                        Ok(sequence) => (sequence, guard.simulator()),
                        Err(e) => {
                            tracing::warn!(error = %e, "debug_prompt failed");
                            return;
                        }
                    }
                };

                let result = simulator.map(|simulator| simulator.execute(sequence));
                handler.complete();

                let Ok(mut guard) = bridge.lock() else {
                    tracing::error!("{}", RegistryError::LockPoisoned);
                    return;
                };
                match result {
                    Some(result) => guard.record_command(sequence, result),
                    None => {
                        if let Err(e) = guard.execute_command(sequence) {
                            tracing::warn!(error = %e, "debug_prompt failed");
                        }
                    }
                }
            }),
        )
    }
}
