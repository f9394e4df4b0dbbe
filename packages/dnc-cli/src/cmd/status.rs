//! Probe the lookup relay and report whether it answers.

use std::time::Duration;

use anyhow::Result;
use console::style;
use dnc_engine::PhoneLookup;
use indicatif::{ProgressBar, ProgressStyle};

use crate::context::{AppContext, RELAY_URL_VAR};

pub async fn run(ctx: &AppContext) -> Result<()> {
    ctx.print_header("Lookup service");

    let lookup = ctx.build_lookup()?;
    if let Ok(url) = std::env::var(RELAY_URL_VAR) {
        if !url.trim().is_empty() {
            ctx.print_info(&format!("Relay override: {}", url.trim()));
        }
    }

    let spinner = create_spinner("Probing relay...");
    let online = lookup.probe().await;
    spinner.finish_and_clear();

    if online {
        println!("{} Online", style("✓").green());
    } else {
        println!("{} Offline", style("✗").red());
    }
    Ok(())
}

fn create_spinner(msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
