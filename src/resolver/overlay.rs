//! Best-effort dismissal of popups, modals and consent banners

use crate::dom::{DomQuery, NamePattern, Query};
use crate::error::QueryError;

/// Overlay patterns, scanned in order
pub const OVERLAY_SELECTORS: &[&str] = &[
    r#"[role="dialog"]"#,
    r#"[aria-modal="true"]"#,
    ".modal",
    ".popup",
    ".overlay",
    r#"[class*="cookie"]"#,
    r#"[id*="cookie"]"#,
    r#"[id*="consent"]"#,
];

/// Dismiss button labels, tried in order (exact, case-insensitive)
pub const DISMISS_LABELS: &[&str] = &[
    "Close",
    "×",
    "✕",
    "Dismiss",
    "No thanks",
    "Got it",
    "Accept all",
    "Accept",
    "OK",
];

fn dismiss_patterns() -> Vec<NamePattern> {
    DISMISS_LABELS
        .iter()
        .map(|label| NamePattern::exact(*label))
        .chain(std::iter::once(NamePattern::contains("close")))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dismissal {
    /// Overlay pattern that found the overlay
    pub selector: &'static str,

    /// Label pattern of the button that was clicked
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Undismissed {
    pub selector: &'static str,
    pub reason: String,
}

/// Outcome of one dismissal sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DismissReport {
    pub dismissed: Vec<Dismissal>,
    pub undismissed: Vec<Undismissed>,
}

impl DismissReport {
    /// Nothing was visible, nothing was clicked
    pub fn is_noop(&self) -> bool {
        self.dismissed.is_empty() && self.undismissed.is_empty()
    }
}

/// Close every visible overlay that offers a recognizable dismiss button.
///
/// Failures are recorded in the report, never raised.
pub fn dismiss_transient_overlays<D: DomQuery>(dom: &D) -> DismissReport {
    let patterns = dismiss_patterns();
    let mut report = DismissReport::default();
    let mut seen: Vec<D::Handle> = Vec::new();

    for &selector in OVERLAY_SELECTORS {
        let overlays = match dom.find(None, &Query::Css(selector)) {
            Ok(overlays) => overlays,
            Err(err) => {
                report.undismissed.push(Undismissed {
                    selector,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        for overlay in overlays {
            if seen.contains(&overlay) || !matches!(dom.is_visible(&overlay), Ok(true)) {
                continue;
            }
            seen.push(overlay.clone());

            match dismiss_one(dom, &overlay, &patterns) {
                Ok(Some(label)) if matches!(dom.is_visible(&overlay), Ok(true)) => {
                    log::warn!("Overlay {} still visible after clicking {}", selector, label);
                    report.undismissed.push(Undismissed {
                        selector,
                        reason: format!("still visible after clicking {}", label),
                    });
                }
                Ok(Some(label)) => {
                    log::debug!("Dismissed overlay {} via {}", selector, label);
                    report.dismissed.push(Dismissal { selector, label });
                }
                Ok(None) => {
                    log::warn!("Overlay {} has no visible dismiss button", selector);
                    report.undismissed.push(Undismissed {
                        selector,
                        reason: "no visible dismiss button".to_string(),
                    });
                }
                Err(err) => {
                    log::warn!("Failed to dismiss overlay {}: {}", selector, err);
                    report.undismissed.push(Undismissed {
                        selector,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    report
}

/// Click the first visible button matching the earliest label pattern
fn dismiss_one<D: DomQuery>(
    dom: &D,
    overlay: &D::Handle,
    patterns: &[NamePattern],
) -> Result<Option<String>, QueryError> {
    for pattern in patterns {
        let query = Query::Role {
            role: "button",
            name: pattern,
        };

        for button in dom.find(Some(overlay), &query)? {
            if matches!(dom.is_visible(&button), Ok(true)) {
                dom.click(&button)?;
                return Ok(Some(pattern.to_string()));
            }
        }
    }
    Ok(None)
}
