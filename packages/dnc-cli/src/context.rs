//! Application context with shared state and utilities

use std::sync::Arc;

use anyhow::Result;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use dnc_engine::{Engine, EngineConfig, PeopleSearchLookup};

/// Environment variable naming an alternate lookup relay base URL.
pub const RELAY_URL_VAR: &str = "DNC_RELAY_URL";

/// Application context passed to all commands
pub struct AppContext {
    pub quiet: bool,
}

impl AppContext {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn theme(&self) -> ColorfulTheme {
        ColorfulTheme::default()
    }

    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.quiet {
            return Ok(default);
        }
        Ok(Confirm::with_theme(&self.theme())
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    /// Build the lookup client, honoring the relay override variable.
    pub fn build_lookup(&self) -> Result<PeopleSearchLookup> {
        let lookup = match std::env::var(RELAY_URL_VAR) {
            Ok(url) if !url.trim().is_empty() => {
                tracing::debug!(relay = %url, "using relay override");
                PeopleSearchLookup::with_base_url(&url)?
            }
            _ => PeopleSearchLookup::new()?,
        };
        Ok(lookup)
    }

    /// Build an engine over the default lookup client and snapshot store.
    pub fn build_engine(&self, config: EngineConfig) -> Result<Engine> {
        let lookup = self.build_lookup()?;
        Ok(Engine::builder(Arc::new(lookup))
            .with_config(config)
            .build())
    }

    pub fn print_header(&self, msg: &str) {
        if !self.quiet {
            println!();
            println!("{}", style(msg).bold());
        }
    }

    pub fn print_success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", style(msg).green());
        }
    }

    pub fn print_warning(&self, msg: &str) {
        if !self.quiet {
            println!("{}", style(msg).yellow());
        }
    }

    pub fn print_info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", style(msg).cyan());
        }
    }
}
