use super::layout::MarkerHit;
use crate::api::{NewsApi, TermBrief, TermId};
use ratatui::layout::Rect;
use tracing::warn;

/// Screen cell the popup hangs from: centered over a marker, one row above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub x: u16,
    pub y: u16,
}

impl Anchor {
    pub fn above(bounds: Rect) -> Self {
        Self {
            x: bounds.x + bounds.width / 2,
            y: bounds.y.saturating_sub(1),
        }
    }

    /// Area for a `width` x `height` popup whose bottom edge sits on the
    /// anchor row, kept inside `area`.
    pub fn popup_area(self, width: u16, height: u16, area: Rect) -> Rect {
        let width = width.min(area.width);
        let height = height.min(area.height);

        let max_x = area.x + area.width - width;
        let x = self.x.saturating_sub(width / 2).clamp(area.x, max_x);

        let max_y = area.y + area.height - height;
        let y = (self.y + 1).saturating_sub(height).clamp(area.y, max_y);

        Rect::new(x, y, width, height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PopupState {
    #[default]
    Closed,
    Open { term: TermBrief, anchor: Anchor },
}

/// Term lookup issued by a click, waiting for its detail fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingLookup {
    pub ticket: u64,
    pub term_id: TermId,
    pub anchor: Anchor,
}

/// Popup over the article body. At most one popup is open; every click
/// closes the current one and only the latest click's lookup may reopen it.
#[derive(Debug, Default)]
pub struct TermPopup {
    state: PopupState,
    pending: Option<PendingLookup>,
    next_ticket: u64,
}

impl TermPopup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PopupState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PopupState::Open { .. })
    }

    pub fn pending(&self) -> Option<PendingLookup> {
        self.pending
    }

    /// Handles a click that resolved to `hit` (in screen coordinates). A miss
    /// closes the popup. A hit also closes it and returns the lookup to run.
    pub fn click(&mut self, hit: Option<MarkerHit>) -> Option<PendingLookup> {
        self.state = PopupState::Closed;
        let Some(hit) = hit else {
            self.pending = None;
            return None;
        };

        self.next_ticket += 1;
        let lookup = PendingLookup {
            ticket: self.next_ticket,
            term_id: hit.term_id,
            anchor: Anchor::above(hit.bounds),
        };
        self.pending = Some(lookup);
        Some(lookup)
    }

    /// Applies the outcome of a lookup. Returns whether the popup changed.
    /// Stale tickets are ignored; a failed lookup leaves the popup closed.
    pub fn resolve(&mut self, ticket: u64, term: Option<TermBrief>) -> bool {
        let Some(pending) = self.pending.filter(|p| p.ticket == ticket) else {
            return false;
        };
        self.pending = None;

        match term {
            Some(term) if term.term_id == pending.term_id => {
                self.state = PopupState::Open {
                    term,
                    anchor: pending.anchor,
                };
                true
            }
            Some(term) => {
                warn!(
                    requested = pending.term_id,
                    received = term.term_id,
                    "term lookup returned a different term"
                );
                false
            }
            None => false,
        }
    }

    pub fn close(&mut self) {
        self.state = PopupState::Closed;
        self.pending = None;
    }
}

/// Fetches the brief for a pending lookup. Failures are logged and reported
/// as `None`.
pub async fn lookup_brief(api: &dyn NewsApi, lookup: PendingLookup) -> Option<TermBrief> {
    match api.term_brief(lookup.term_id).await {
        Ok(brief) => Some(brief),
        Err(e) => {
            warn!(term_id = lookup.term_id, "term lookup failed: {}", e);
            None
        }
    }
}
