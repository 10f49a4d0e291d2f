//! Terminal stand-ins for the map and the response bubble.

use std::io::Write;
use std::time::Duration;

use tracing::{debug, info};

use beaty_core::config::EdgePadding;
use beaty_core::events::UiEvent;
use beaty_core::types::{Bounds, LatLng, MarkerSet, SessionId};
use beaty_session::{CameraCoordinator, SettleSignal};

/// Camera that logs every move and settles after the requested animation time.
#[derive(Debug, Default)]
pub struct ConsoleCamera {
    animation: Duration,
}

impl ConsoleCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CameraCoordinator for ConsoleCamera {
    fn set_center_and_zoom(&mut self, center: LatLng, zoom: f64, duration: Duration) {
        info!(lat = center.lat, lng = center.lng, zoom, "Camera centered");
        self.animation = duration;
    }

    fn fit_bounds(&mut self, bounds: Bounds, padding: EdgePadding, max_zoom: f64, duration: Duration) {
        info!(
            south = bounds.south_west.lat,
            west = bounds.south_west.lng,
            north = bounds.north_east.lat,
            east = bounds.north_east.lng,
            max_zoom,
            ?padding,
            "Camera fitted to bounds"
        );
        self.animation = duration;
    }

    fn on_settled(&mut self, signal: SettleSignal) {
        let delay = self.animation;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(ticket = ?signal.ticket(), "Camera animation finished");
            signal.fire();
        });
    }

    fn place_markers(&mut self, markers: &MarkerSet) {
        let mut out = std::io::stdout().lock();
        for marker in markers {
            let rank = marker.rank.map(|r| format!("{r}. ")).unwrap_or_default();
            let label = marker.label.as_deref().unwrap_or("(unnamed)");
            let _ = writeln!(
                out,
                "  📍 {rank}{label} ({:.5}, {:.5})",
                marker.position.lat, marker.position.lng
            );
        }
    }

    fn clear_markers(&mut self) {
        debug!("Markers cleared");
    }
}

/// Renders [`UiEvent`]s as a growing line of text.
///
/// Reveal events carry the whole visible text; only the new suffix is written
/// unless the text was replaced, in which case the line is restarted.
#[derive(Debug, Default)]
pub struct ConsolePrinter {
    session: Option<SessionId>,
    shown: String,
}

impl ConsolePrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// What to write for `event`, if anything.
    pub fn render(&mut self, event: &UiEvent) -> Option<String> {
        match event {
            UiEvent::TextRevealed { session, text, .. } => {
                if self.session != Some(*session) {
                    self.session = Some(*session);
                    self.shown.clear();
                    self.shown.push_str(text);
                    return Some(format!("\nbeaty> {text}"));
                }
                let out = match text.strip_prefix(self.shown.as_str()) {
                    Some(suffix) => suffix.to_string(),
                    None => format!("\r\x1b[2Kbeaty> {text}"),
                };
                self.shown.clear();
                self.shown.push_str(text);
                (!out.is_empty()).then_some(out)
            }
            UiEvent::ErrorShown { message, .. } => {
                self.shown.clear();
                Some(format!("\r\x1b[2Kbeaty> {message}\n"))
            }
            UiEvent::BubbleDismissed { session, .. } if self.session == Some(*session) => {
                self.session = None;
                self.shown.clear();
                Some("\n".to_string())
            }
            _ => None,
        }
    }

    pub fn print(&mut self, event: &UiEvent) {
        if let Some(out) = self.render(event) {
            let mut stdout = std::io::stdout().lock();
            let _ = stdout.write_all(out.as_bytes());
            let _ = stdout.flush();
        }
    }
}
