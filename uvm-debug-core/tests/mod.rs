use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use uvm_debug_core::backend::{NativeConsole, NoBackend, VendorBackend, backend_for};
use uvm_debug_core::buffer::DEFAULT_CAPACITY;
use uvm_debug_core::error::BridgeResult;
use uvm_debug_core::trigger::{DEBUG_PROMPT_COMMAND, TRIGGER_SEQUENCE, compose_command};
use uvm_debug_core::{
    BackendKind, BridgeConfig, BridgeError, CommandBridge, CommandRegistry, HandlerTable,
    LocalConsole, SimulatorConsole, TriggerHandler, TriggerState,
};

// ============================================================================
// Test doubles
// ============================================================================

/// Write half that tests can inspect after handing it to the bridge.
#[derive(Clone, Default)]
struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl SharedWriter {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Simulator console that records commands and replays scripted lines.
#[derive(Clone, Default)]
struct RecordingConsole {
    commands: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    lines: Arc<Mutex<Vec<String>>>,
    fail_with: Option<String>,
}

impl RecordingConsole {
    fn with_lines(lines: &[&str]) -> Self {
        let console = Self::default();
        console
            .lines
            .lock()
            .unwrap()
            .extend(lines.iter().rev().map(|s| s.to_string()));
        console
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

impl SimulatorConsole for RecordingConsole {
    fn execute(&self, command: &str) -> BridgeResult<()> {
        if let Some(msg) = &self.fail_with {
            return Err(BridgeError::Console(msg.clone()));
        }
        self.commands.lock().unwrap().push(command.to_string());
        Ok(())
    }

    fn readline(&self, prompt: &str) -> BridgeResult<Option<String>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.lines.lock().unwrap().pop())
    }
}

/// Simulator console whose commands resume a simulation that reads the
/// bridge buffer before the command returns.
#[derive(Clone, Default)]
struct ReentrantConsole {
    bridge: Arc<OnceLock<Weak<Mutex<CommandBridge>>>>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl SimulatorConsole for ReentrantConsole {
    fn execute(&self, _command: &str) -> BridgeResult<()> {
        let Some(shared) = self.bridge.get().and_then(Weak::upgrade) else {
            return Ok(());
        };
        let seen = match shared.try_lock() {
            Ok(bridge) => bridge.get_buffer(),
            Err(_) => "<locked>".to_string(),
        };
        self.seen.lock().unwrap().push(seen);
        Ok(())
    }

    fn readline(&self, _prompt: &str) -> BridgeResult<Option<String>> {
        Ok(None)
    }
}

struct Harness {
    bridge: CommandBridge,
    output: SharedWriter,
    status: SharedWriter,
}

fn native_bridge(input: &str, capacity: usize) -> Harness {
    let output = SharedWriter::default();
    let status = SharedWriter::default();
    let console = LocalConsole::new(
        Box::new(Cursor::new(input.as_bytes().to_vec())),
        Box::new(output.clone()),
    );
    let bridge = CommandBridge::new(Box::new(NativeConsole), console, capacity)
        .with_status(Box::new(status.clone()));
    Harness {
        bridge,
        output,
        status,
    }
}

fn vendor_bridge(console: RecordingConsole, capacity: usize) -> (CommandBridge, SharedWriter) {
    let status = SharedWriter::default();
    let local = LocalConsole::new(Box::new(Cursor::new(Vec::new())), Box::new(std::io::sink()));
    let bridge = CommandBridge::new(
        Box::new(VendorBackend::vendor_a(Box::new(console))),
        local,
        capacity,
    )
    .with_status(Box::new(status.clone()));
    (bridge, status)
}

// ============================================================================
// execute_command
// ============================================================================

#[test]
fn test_execute_forwards_verbatim_to_vendor() {
    let console = RecordingConsole::default();
    let (mut bridge, status) = vendor_bridge(console.clone(), DEFAULT_CAPACITY);

    bridge.execute_command("  probe -create top.dut  ").unwrap();

    assert_eq!(console.commands(), vec!["  probe -create top.dut  "]);
    assert!(status.contents().is_empty());
}

#[test]
fn test_execute_without_backend_reports_once() {
    let status = SharedWriter::default();
    let console = LocalConsole::new(Box::new(Cursor::new(Vec::new())), Box::new(std::io::sink()));
    let mut bridge = CommandBridge::new(Box::new(NoBackend), console, DEFAULT_CAPACITY)
        .with_status(Box::new(status.clone()));

    bridge.execute_command("foo").unwrap();

    let diag = status.contents();
    assert_eq!(diag.lines().count(), 1);
    assert!(diag.contains("not supported"));
    assert_eq!(bridge.backend_kind(), BackendKind::Unsupported);
}

#[test]
fn test_execute_native_reports_per_call() {
    let mut h = native_bridge("", DEFAULT_CAPACITY);
    h.bridge.execute_command("run").unwrap();
    h.bridge.execute_command("run").unwrap();
    assert_eq!(h.status.contents().lines().count(), 2);
    assert!(h.output.contents().is_empty());
}

#[test]
fn test_execute_propagates_console_failure() {
    let console = RecordingConsole {
        fail_with: Some("invalid command name".to_string()),
        ..Default::default()
    };
    let (mut bridge, status) = vendor_bridge(console, DEFAULT_CAPACITY);

    let err = bridge.execute_command("bogus").unwrap_err();
    assert!(matches!(err, BridgeError::Console(ref m) if m.contains("invalid")));
    assert!(status.contents().is_empty());
}

// ============================================================================
// read_line / get_buffer
// ============================================================================

#[test]
fn test_native_prompt_then_line() {
    let mut h = native_bridge("hello\n", DEFAULT_CAPACITY);

    let line = h.bridge.read_line("> ").unwrap();

    assert_eq!(line, "hello");
    assert_eq!(h.output.contents(), "> ");
    assert_eq!(h.bridge.get_buffer(), "hello");
}

#[test]
fn test_read_line_under_capacity() {
    let text = "x".repeat(DEFAULT_CAPACITY - 1);
    let mut h = native_bridge(&format!("{}\n", text), DEFAULT_CAPACITY);
    assert_eq!(h.bridge.read_line("").unwrap(), text);
}

#[test]
fn test_read_line_at_capacity_overflows() {
    let text = "y".repeat(DEFAULT_CAPACITY);
    let mut h = native_bridge(&format!("{}\nnext\n", text), DEFAULT_CAPACITY);

    match h.bridge.read_line("") {
        Err(BridgeError::InputOverflow { capacity, len }) => {
            assert_eq!(capacity, DEFAULT_CAPACITY);
            assert_eq!(len, DEFAULT_CAPACITY);
        }
        other => panic!("expected InputOverflow, got {:?}", other),
    }
    assert_eq!(h.bridge.get_buffer(), "");
    assert_eq!(h.bridge.read_line("").unwrap(), "next");
}

#[test]
fn test_read_line_end_of_input() {
    let mut h = native_bridge("", DEFAULT_CAPACITY);
    assert!(matches!(h.bridge.read_line("> "), Err(BridgeError::EndOfInput)));
    assert_eq!(h.output.contents(), "> ");
}

#[test]
fn test_read_overwrites_buffer_but_copies_survive() {
    let mut h = native_bridge("one\ntwo\n", DEFAULT_CAPACITY);
    let first = h.bridge.read_line("").unwrap();
    let second = h.bridge.read_line("").unwrap();
    assert_eq!(first, "one");
    assert_eq!(second, "two");
    assert_eq!(h.bridge.get_buffer(), "two");
}

#[test]
fn test_get_buffer_idempotent() {
    let mut h = native_bridge("stable\n", DEFAULT_CAPACITY);
    h.bridge.read_line("").unwrap();
    assert_eq!(h.bridge.get_buffer(), h.bridge.get_buffer());
}

#[test]
fn test_vendor_read_uses_simulator_prompt() {
    let console = RecordingConsole::with_lines(&["stop -show\n"]);
    let (mut bridge, _status) = vendor_bridge(console.clone(), DEFAULT_CAPACITY);

    assert_eq!(bridge.read_line("ncsim> ").unwrap(), "stop -show");
    assert_eq!(*console.prompts.lock().unwrap(), vec!["ncsim> "]);
    assert!(matches!(bridge.read_line("ncsim> "), Err(BridgeError::EndOfInput)));
}

#[test]
fn test_vendor_read_enforces_capacity() {
    let console = RecordingConsole::with_lines(&["12345678"]);
    let (mut bridge, _status) = vendor_bridge(console, 8);
    assert!(matches!(
        bridge.read_line(""),
        Err(BridgeError::InputOverflow { capacity: 8, len: 8 })
    ));
    assert_eq!(bridge.get_buffer(), "");
}

// ============================================================================
// Trigger handler
// ============================================================================

#[test]
fn test_trigger_composes_and_issues_sequence_once() {
    let console = RecordingConsole::default();
    let (mut bridge, _status) = vendor_bridge(console.clone(), DEFAULT_CAPACITY);
    let mut handler = TriggerHandler::new();

    handler.invoke(&mut bridge, &["step", "5"]).unwrap();

    assert_eq!(bridge.get_buffer(), "step 5 ");
    assert_eq!(console.commands(), vec![TRIGGER_SEQUENCE.to_string()]);
    assert_eq!(handler.state(), TriggerState::Idle);
}

#[test]
fn test_trigger_without_tokens_clears_buffer() {
    let console = RecordingConsole::default();
    let (mut bridge, _status) = vendor_bridge(console.clone(), DEFAULT_CAPACITY);
    bridge.set_buffer("stale").unwrap();

    TriggerHandler::new()
        .invoke::<&str>(&mut bridge, &[])
        .unwrap();

    assert_eq!(bridge.get_buffer(), "");
    assert_eq!(console.commands().len(), 1);
}

#[test]
fn test_trigger_overflow_issues_nothing() {
    let console = RecordingConsole::default();
    let (mut bridge, _status) = vendor_bridge(console.clone(), 8);

    let err = TriggerHandler::new()
        .invoke(&mut bridge, &["verbose", "on"])
        .unwrap_err();

    assert!(matches!(err, BridgeError::InputOverflow { len: 11, .. }));
    assert!(console.commands().is_empty());
}

#[test]
fn test_trigger_on_native_inherits_diagnostic() {
    let mut h = native_bridge("", DEFAULT_CAPACITY);
    TriggerHandler::new()
        .invoke(&mut h.bridge, &["print", "cfg"])
        .unwrap();
    assert_eq!(h.bridge.get_buffer(), "print cfg ");
    assert_eq!(h.status.contents().lines().count(), 1);
}

#[test]
fn test_trigger_registered_as_debug_prompt() {
    let console = RecordingConsole::default();
    let (bridge, _status) = vendor_bridge(console.clone(), DEFAULT_CAPACITY);
    let shared = bridge.into_shared();
    let mut table = HandlerTable::new();

    TriggerHandler::register(&mut table, shared.clone()).unwrap();
    assert_eq!(table.names(), vec![DEBUG_PROMPT_COMMAND]);

    table
        .invoke(DEBUG_PROMPT_COMMAND, &["step".to_string(), "5".to_string()])
        .unwrap();

    assert_eq!(shared.lock().unwrap().get_buffer(), "step 5 ");
    assert_eq!(console.commands(), vec![TRIGGER_SEQUENCE.to_string()]);
}

#[test]
fn test_registered_trigger_unlocks_bridge_while_simulator_runs() {
    let console = ReentrantConsole::default();
    let local = LocalConsole::new(Box::new(Cursor::new(Vec::new())), Box::new(std::io::sink()));
    let shared = CommandBridge::new(
        Box::new(VendorBackend::vendor_a(Box::new(console.clone()))),
        local,
        DEFAULT_CAPACITY,
    )
    .with_status(Box::new(std::io::sink()))
    .into_shared();
    console.bridge.set(Arc::downgrade(&shared)).unwrap();

    let mut table = HandlerTable::new();
    TriggerHandler::register(&mut table, shared.clone()).unwrap();
    table
        .invoke(DEBUG_PROMPT_COMMAND, &["step".to_string(), "5".to_string()])
        .unwrap();

    assert_eq!(*console.seen.lock().unwrap(), vec!["step 5 ".to_string()]);
}

#[test]
fn test_registered_trigger_reports_simulator_failure() {
    let console = RecordingConsole {
        fail_with: Some("no such object".to_string()),
        ..RecordingConsole::default()
    };
    let (bridge, status) = vendor_bridge(console, DEFAULT_CAPACITY);
    let shared = bridge.into_shared();
    let mut table = HandlerTable::new();
    TriggerHandler::register(&mut table, shared.clone()).unwrap();

    table
        .invoke(DEBUG_PROMPT_COMMAND, &["step".to_string()])
        .unwrap();

    assert_eq!(shared.lock().unwrap().get_buffer(), "step ");
    assert!(status.contents().contains("no such object"));
}

#[test]
fn test_trigger_begin_then_complete() {
    let console = RecordingConsole::default();
    let (mut bridge, _status) = vendor_bridge(console.clone(), DEFAULT_CAPACITY);
    let mut handler = TriggerHandler::new();

    let sequence = handler.begin(&mut bridge, &["up"]).unwrap();
    assert_eq!(sequence, TRIGGER_SEQUENCE);
    assert_eq!(handler.state(), TriggerState::CommandIssued);
    assert_eq!(bridge.get_buffer(), "up ");
    assert!(console.commands().is_empty());

    bridge
        .simulator()
        .expect("vendor backend exposes its console")
        .execute(sequence)
        .unwrap();
    handler.complete();

    assert_eq!(handler.state(), TriggerState::Idle);
    assert_eq!(console.commands(), vec![TRIGGER_SEQUENCE.to_string()]);
}

#[test]
fn test_trigger_double_registration_rejected() {
    let h = native_bridge("", DEFAULT_CAPACITY);
    let shared = h.bridge.into_shared();
    let mut table = HandlerTable::new();
    TriggerHandler::register(&mut table, shared.clone()).unwrap();
    assert!(TriggerHandler::register(&mut table, shared).is_err());
}

#[test]
fn test_custom_registry_receives_name() {
    #[derive(Default)]
    struct NameLog(Vec<String>);

    impl CommandRegistry for NameLog {
        fn register_command(
            &mut self,
            name: &str,
            _handler: uvm_debug_core::CommandHandler,
        ) -> Result<(), uvm_debug_core::RegistryError> {
            self.0.push(name.to_string());
            Ok(())
        }
    }

    let h = native_bridge("", DEFAULT_CAPACITY);
    let mut log = NameLog::default();
    TriggerHandler::register(&mut log, h.bridge.into_shared()).unwrap();
    assert_eq!(log.0, vec!["debug_prompt"]);
}

#[test]
fn test_compose_matches_buffer_format() {
    assert_eq!(compose_command(&["a"]), "a ");
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_from_config_native() {
    let config = BridgeConfig {
        capacity: 32,
        ..BridgeConfig::default()
    };
    let bridge = CommandBridge::from_config(&config, None, LocalConsole::new(
        Box::new(Cursor::new(Vec::new())),
        Box::new(std::io::sink()),
    ))
    .unwrap();
    assert_eq!(bridge.backend_kind(), BackendKind::Native);
    assert_eq!(bridge.capacity(), 32);
}

#[test]
fn test_vendor_backend_requires_console() {
    assert!(backend_for(BackendKind::VendorB, None).is_err());
    let backend = backend_for(
        BackendKind::VendorB,
        Some(Box::new(RecordingConsole::default())),
    )
    .unwrap();
    assert_eq!(backend.kind(), BackendKind::VendorB);
    assert!(backend.can_read());
}

#[test]
fn test_backend_kind_parse_and_display() {
    for (text, kind) in [
        ("native", BackendKind::Native),
        ("NCSC", BackendKind::VendorA),
        ("mentor", BackendKind::VendorB),
        ("none", BackendKind::Unsupported),
    ] {
        let parsed: BackendKind = text.parse().unwrap();
        assert_eq!(parsed, kind);
        assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
    }
    assert!("xcelium-ml".parse::<BackendKind>().is_err());
}

#[test]
fn test_backend_kind_serde() {
    let json = serde_json::to_string(&BackendKind::VendorA).unwrap();
    assert_eq!(json, "\"vendor_a\"");
}
