//! CLI argument definitions for the Beaty client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::Parser;

use beaty_core::config::BeatyConfig;
use beaty_core::types::{LatLng, QueryMode, QueryRequest};

/// Beaty: ask about places and watch the answer land on the map.
#[derive(Parser, Debug)]
#[command(name = "beaty", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Bearer token for the query service.
    #[arg(long = "token")]
    pub token: Option<String>,

    /// Base URL of the query service, e.g. http://localhost:8000.
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Ask the server for pipeline steps alongside the answer.
    #[arg(long = "test-mode")]
    pub test_mode: bool,

    /// Current position as `LAT,LNG`, sent with every query.
    #[arg(long = "location", value_parser = parse_location)]
    pub location: Option<LatLng>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Ask one question and exit. Without it, queries are read from stdin.
    pub query: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > BEATY_CONFIG env var > ~/.beaty/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("BEATY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Fold flag and environment overrides into `config`.
    pub fn apply(&self, config: &mut BeatyConfig) {
        if let Some(ref url) = self.base_url {
            config.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(token) = self.token.clone().or_else(|| std::env::var("BEATY_TOKEN").ok()) {
            config.api.token = Some(token);
        }
        if self.test_mode {
            config.api.mode = QueryMode::Test;
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }

    /// Build the request for one line of user input.
    pub fn request(&self, text: &str, mode: QueryMode) -> QueryRequest {
        let request = QueryRequest::new(text.trim()).with_mode(mode);
        match self.location {
            Some(location) => request.with_location(location),
            None => request,
        }
    }
}

fn parse_location(s: &str) -> Result<LatLng, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got {s:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(format!("coordinates out of range: {lat},{lng}"));
    }
    Ok(LatLng::new(lat, lng))
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".beaty").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".beaty").join("config.toml");
    }
    PathBuf::from("config.toml")
}
