use chrono::NaiveDateTime;

use crate::heatmap::HeatmapGrid;
use crate::models::{Alert, MitreTag};
use crate::severity::Tier;

const PLACEHOLDER: &str = "—";

/// Opaque rendering sink: something that can take a full markup replacement.
/// A page without the element simply has no surface, and the renderers no-op.
pub trait Surface: Send + Sync {
    fn replace(&mut self, markup: &str);
    /// Used by panels that start hidden (drill-down).
    fn show(&mut self) {}
}

/// Sink that forwards frames to the log. Stands in for a real DOM target
/// when the engine runs headless.
pub struct LogSurface {
    pub target: &'static str,
}

impl Surface for LogSurface {
    fn replace(&mut self, markup: &str) {
        tracing::debug!(target: "alertdash::render", surface = self.target, bytes = markup.len(), "frame replaced");
    }

    fn show(&mut self) {
        tracing::debug!(target: "alertdash::render", surface = self.target, "panel shown");
    }
}

/// Transient toast channel. Only the most recent message matters; the host
/// clears it after a couple of seconds.
pub trait Notifier: Send + Sync {
    fn toast(&mut self, message: &str);
}

pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn toast(&mut self, message: &str) {
        tracing::info!(target: "alertdash::toast", "{message}");
    }
}

/// Angle brackets are the only characters the feed neutralizes; alert
/// commands are untrusted input dropped straight into row markup.
pub fn escape_angle(raw: &str) -> String {
    raw.replace('<', "&lt;").replace('>', "&gt;")
}

/// Second-precision, space-separated timestamp, or the placeholder when the
/// alert carried none.
pub fn display_timestamp(ts: &str) -> String {
    if ts.is_empty() {
        return PLACEHOLDER.to_string();
    }
    match NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        // not ISO; best-effort truncation keeps the feed rendering
        Err(_) => ts.replace('T', " ").chars().take(19).collect(),
    }
}

pub fn severity_badge(raw: &str) -> String {
    let shown = if raw.is_empty() {
        "UNKNOWN".to_string()
    } else {
        raw.to_ascii_uppercase()
    };
    let class = Tier::classify(raw).badge_class();
    format!("<span class=\"badge {class}\">{shown}</span>")
}

fn mitre_cell(mitre: Option<&MitreTag>) -> String {
    let Some(tag) = mitre else {
        return PLACEHOLDER.to_string();
    };
    let id = if tag.id.is_empty() { "N/A" } else { &tag.id };
    let tactic = if tag.tactic.is_empty() { "Unknown" } else { &tag.tactic };
    format!(
        "<span class=\"badge unknown\">{id}</span>\
         <div class=\"muted\" style=\"font-size:11px;margin-top:4px\">{tactic}</div>"
    )
}

fn feed_row(alert: &Alert, flash_new: bool) -> String {
    let class = if flash_new { " class=\"flash-new\"" } else { "" };
    let ts = display_timestamp(&alert.timestamp);
    let kind = if alert.kind.is_empty() { PLACEHOLDER } else { &alert.kind };
    let src = alert.src_ip.as_deref().unwrap_or(PLACEHOLDER);
    let command = alert
        .command
        .as_deref()
        .map(escape_angle)
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    format!(
        "<tr{class}>\
         <td>{ts}</td>\
         <td><b>{kind}</b></td>\
         <td>{badge}</td>\
         <td><code>{src}</code></td>\
         <td style=\"max-width:420px;white-space:nowrap;overflow:hidden;text-overflow:ellipsis\">{command}</td>\
         <td>{mitre}</td>\
         </tr>",
        badge = severity_badge(&alert.severity),
        mitre = mitre_cell(alert.mitre.as_ref()),
    )
}

/// Full-replace row markup for the alert table, newest first. Rows of a new
/// batch carry a transient highlight class that the next replace clears.
pub fn feed_markup(alerts: &[Alert], new_batch: bool) -> String {
    alerts
        .iter()
        .rev()
        .map(|a| feed_row(a, new_batch))
        .collect()
}

pub struct AlertFeedRenderer {
    pub target: Option<Box<dyn Surface>>,
}

impl AlertFeedRenderer {
    pub fn render(&mut self, alerts: &[Alert], new_batch: bool) {
        if let Some(target) = self.target.as_mut() {
            target.replace(&feed_markup(alerts, new_batch));
        }
    }
}

fn grid_columns(techniques: usize) -> String {
    format!("grid-template-columns:220px repeat({techniques}, minmax(80px, 1fr))")
}

/// Markup for the canonical heatmap grid. The dense layout gets a header row
/// of technique ids; the sparse layout labels each cell instead.
pub fn heatmap_markup(grid: &HeatmapGrid) -> String {
    match grid {
        HeatmapGrid::Placeholder(message) => {
            format!("<div class=\"muted\">{message}</div>")
        }
        HeatmapGrid::Grid { techniques, rows } => {
            let mut out = String::new();
            if !techniques.is_empty() {
                let cols = grid_columns(techniques.len());
                out.push_str(&format!(
                    "<div class=\"hm-row hm-header\" style=\"{cols}\"><div></div>"
                ));
                for technique in techniques {
                    out.push_str(&format!("<div>{technique}</div>"));
                }
                out.push_str("</div>");
            }
            for row in rows {
                if techniques.is_empty() {
                    out.push_str("<div class=\"hm-row\">");
                } else {
                    out.push_str(&format!(
                        "<div class=\"hm-row\" style=\"{}\">",
                        grid_columns(techniques.len())
                    ));
                }
                out.push_str(&format!("<div class=\"hm-tactic\">{}</div>", row.tactic));
                for cell in &row.cells {
                    out.push_str(&format!(
                        "<div class=\"hm-cell\" style=\"background:{}\" title=\"{}\">{}</div>",
                        cell.color.css(),
                        cell.tooltip,
                        cell.label,
                    ));
                }
                out.push_str("</div>");
            }
            out
        }
    }
}

/// Detail-panel rows for one technique's alerts; the panel is made visible
/// alongside the replace.
pub fn drill_down(technique_id: &str, alerts: &[Alert], panel: &mut dyn Surface) {
    tracing::debug!(target: "alertdash::render", technique = technique_id, rows = alerts.len(), "drill-down");
    let mut body = String::new();
    for alert in alerts {
        let ts = if alert.timestamp.is_empty() { PLACEHOLDER } else { &alert.timestamp };
        let kind = if alert.kind.is_empty() { PLACEHOLDER } else { &alert.kind };
        let src = alert.src_ip.as_deref().unwrap_or(PLACEHOLDER);
        let command = alert
            .command
            .as_deref()
            .map(escape_angle)
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        body.push_str(&format!(
            "<tr><td>{ts}</td><td>{kind}</td><td>{sev}</td><td>{src}</td>\
             <td style=\"max-width:400px\">{command}</td></tr>",
            sev = alert.severity,
        ));
    }
    panel.replace(&body);
    panel.show();
}

/// Shared in-memory sink used by view and loop tests to observe frames.
#[cfg(test)]
pub mod testing {
    use super::{Notifier, Surface};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct SurfaceState {
        frames: Vec<String>,
        visible: bool,
    }

    #[derive(Clone, Default)]
    pub struct SharedSurface {
        state: Arc<Mutex<SurfaceState>>,
    }

    impl SharedSurface {
        pub fn new() -> SharedSurface {
            SharedSurface::default()
        }

        pub fn last(&self) -> Option<String> {
            self.state.lock().unwrap().frames.last().cloned()
        }

        pub fn frame_count(&self) -> usize {
            self.state.lock().unwrap().frames.len()
        }

        pub fn visible(&self) -> bool {
            self.state.lock().unwrap().visible
        }
    }

    impl Surface for SharedSurface {
        fn replace(&mut self, markup: &str) {
            self.state.lock().unwrap().frames.push(markup.to_string());
        }

        fn show(&mut self) {
            self.state.lock().unwrap().visible = true;
        }
    }

    #[derive(Clone, Default)]
    pub struct SharedNotifier {
        toasts: Arc<Mutex<Vec<String>>>,
    }

    impl SharedNotifier {
        pub fn new() -> SharedNotifier {
            SharedNotifier::default()
        }

        pub fn toasts(&self) -> Vec<String> {
            self.toasts.lock().unwrap().clone()
        }
    }

    impl Notifier for SharedNotifier {
        fn toast(&mut self, message: &str) {
            self.toasts.lock().unwrap().push(message.to_string());
        }
    }
}
