//! Run a batch check over a file with live progress and key controls.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use dnc_engine::{CheckOptions, DncStatus, EngineConfig, EngineEvent, RunState};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;

use crate::context::AppContext;
use crate::intake;
use crate::table;

pub struct RunArgs {
    pub file: PathBuf,
    pub no_registry: bool,
    pub no_details: bool,
    pub delay_ms: u64,
    pub show_log: bool,
}

pub async fn run(ctx: &AppContext, args: RunArgs) -> Result<()> {
    let queue = intake::load_queue(&args.file)?;

    let config = EngineConfig {
        item_delay: Duration::from_millis(args.delay_ms),
        options: CheckOptions {
            registry_check: !args.no_registry,
            person_details: !args.no_details,
        },
        ..EngineConfig::default()
    };
    let engine = ctx.build_engine(config)?;
    engine.restore().await?;
    let queued = engine.load_queue(queue)?;

    ctx.print_header(&format!(
        "DNC check: {} numbers from {}",
        queued,
        args.file.display()
    ));

    let interactive = !ctx.quiet && console::user_attended();
    if interactive {
        println!(
            "{}",
            "Keys: [p]ause  [r]esume  [s]kip  [c]ancel  [q]uit".dimmed()
        );
    }

    let mut events = engine.subscribe();
    engine.start()?;

    let progress = create_progress_bar(queued as u64);
    let raw_guard = if interactive {
        Some(RawModeGuard::enable()?)
    } else {
        None
    };
    let mut keys = if interactive {
        Some(EventStream::new())
    } else {
        None
    };

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(EngineEvent::ItemStarted { phone, .. }) => {
                    progress.set_message(phone.formatted());
                }
                Ok(EngineEvent::ItemFinished { record, .. }) => {
                    progress.inc(1);
                    if record.failed {
                        progress.println(format!(
                            "  {} {} lookup failed",
                            "✗".red(),
                            record.phone.formatted()
                        ));
                    } else if record.dnc_status == DncStatus::Yes {
                        progress.println(format!(
                            "  {} {} is DNC listed",
                            "!".red().bold(),
                            record.phone.formatted()
                        ));
                    }
                }
                Ok(EngineEvent::ItemSkipped { phone, .. }) => {
                    progress.inc(1);
                    progress.println(format!("  {} {} skipped", "~".dimmed(), phone.formatted()));
                }
                Ok(EngineEvent::Paused) => progress.set_message("paused"),
                Ok(EngineEvent::Resumed) => progress.set_message("resuming"),
                Ok(EngineEvent::Completed { .. }) => {
                    progress.finish_with_message("done");
                    break;
                }
                Ok(EngineEvent::Cancelled) => {
                    progress.abandon_with_message("cancelled");
                    break;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Fell behind; resync the bar from the engine.
                    progress.set_position(engine.status().cursor as u64);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            Some(Ok(event)) = poll_keys(&mut keys) => {
                // Non-key events (resize) still have to be drained, or the
                // stream stops being polled while the run is paused.
                let Event::Key(key) = event else { continue };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match (key.code, key.modifiers) {
                    (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                        engine.cancel(true)?;
                    }
                    (KeyCode::Char('p'), _) => engine.pause(),
                    (KeyCode::Char('r'), _) => engine.resume(),
                    (KeyCode::Char('s'), _) => engine.skip(),
                    (KeyCode::Char('c'), _) => {
                        let confirmed =
                            progress.suspend(|| ctx.confirm("Cancel this run?", false))?;
                        if confirmed {
                            engine.cancel(true)?;
                        }
                    }
                    (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => {
                        engine.cancel(true)?;
                    }
                    _ => {}
                }
            }
        }
    }

    // Let the closing snapshot land before the process exits.
    let status = engine.status();
    if status.state == RunState::Completed || status.totals.processed > 0 {
        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await {
                    Ok(EngineEvent::SnapshotSaved { .. }) => break,
                    Err(broadcast::error::RecvError::Closed) => break,
                    _ => {}
                }
            }
        })
        .await;
    }

    drop(raw_guard);
    table::print_summary(&engine.status());
    if args.show_log {
        table::print_log_tail(&engine.log().recent(10));
    }
    Ok(())
}

async fn poll_keys(keys: &mut Option<EventStream>) -> Option<std::io::Result<Event>> {
    match keys.as_mut() {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let progress = ProgressBar::new(total);
    progress.set_style(
        ProgressStyle::default_bar()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} [{bar:40.green}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("█░"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::terminal::disable_raw_mode();
    }
}
