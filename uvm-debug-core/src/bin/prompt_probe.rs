// uvm-debug-core/src/bin/prompt_probe.rs

use anyhow::{Context, Result, anyhow};
use uvm_debug_core::telemetry::{init_tracing, install_panic_hook};
use uvm_debug_core::{
    BridgeConfig, BridgeError, CommandBridge, HandlerTable, LocalConsole, SharedBridge,
    TriggerHandler,
};

fn main() -> Result<()> {
    init_tracing();
    install_panic_hook();

    // Make sure *something* always prints even if RUST_LOG filters everything.
    eprintln!("[prompt_probe] starting… (Ctrl+C to exit)");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(run());

    // A read blocked on stdin must not hold up shutdown.
    runtime.shutdown_background();
    result
}

async fn run() -> Result<()> {
    let config = BridgeConfig::from_env().context("Failed to resolve bridge config")?;
    let bridge = CommandBridge::from_config(&config, None, LocalConsole::stdio())
        .context("CommandBridge::from_config failed")?
        .into_shared();

    let mut commands = HandlerTable::new();
    TriggerHandler::register(&mut commands, bridge.clone())
        .context("Failed to register debug_prompt")?;

    eprintln!(
        "[prompt_probe] backend={} capacity={} commands={:?}",
        config.backend,
        config.capacity,
        commands.names()
    );

    loop {
        let read = read_line(bridge.clone(), config.prompt.clone());

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n[prompt_probe] Ctrl+C received, exiting…");
                break;
            }

            line = read => line?,
        };

        let line = match line {
            Ok(line) => line,
            Err(BridgeError::EndOfInput) => {
                eprintln!("\n[prompt_probe] stdin closed, exiting…");
                break;
            }
            Err(e @ BridgeError::InputOverflow { .. }) => {
                eprintln!("[prompt_probe] {}", e);
                continue;
            }
            Err(e) => return Err(e).context("read_line failed"),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("exit") {
            eprintln!("[prompt_probe] exit requested, exiting…");
            break;
        }

        dispatch(&bridge, &mut commands, trimmed)?;
    }

    Ok(())
}

/// Reads block on stdin, so they run on the blocking pool.
async fn read_line(bridge: SharedBridge, prompt: String) -> Result<Result<String, BridgeError>> {
    tokio::task::spawn_blocking(move || {
        let mut bridge = bridge
            .lock()
            .map_err(|_| anyhow!("command bridge lock poisoned"))?;
        Ok::<_, anyhow::Error>(bridge.read_line(&prompt))
    })
    .await
    .context("reader task failed")?
}

fn dispatch(bridge: &SharedBridge, commands: &mut HandlerTable, line: &str) -> Result<()> {
    let mut tokens = line.split_whitespace();
    let Some(first) = tokens.next() else {
        return Ok(());
    };

    if first == "buffer" {
        let bridge = bridge
            .lock()
            .map_err(|_| anyhow!("command bridge lock poisoned"))?;
        println!("{}", bridge.get_buffer());
        return Ok(());
    }

    if commands.contains(first) {
        let args: Vec<String> = tokens.map(str::to_string).collect();
        commands
            .invoke(first, &args)
            .with_context(|| format!("{} failed", first))?;
        return Ok(());
    }

    let mut bridge = bridge
        .lock()
        .map_err(|_| anyhow!("command bridge lock poisoned"))?;
    bridge
        .execute_command(line)
        .context("execute_command failed")
}
