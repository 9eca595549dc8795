//! Inline term support for the article view: polling the backend for
//! extracted terms, marking them in the body, and resolving clicks on them.

pub mod highlight;
pub mod layout;
pub mod poller;
pub mod popup;

pub use highlight::{HighlightedDocument, Segment};
pub use layout::{DocumentLayout, MarkerHit};
pub use poller::{PollEvent, PollHandle, SessionId, StopReason, TermPoller};
pub use popup::{lookup_brief, Anchor, PendingLookup, PopupState, TermPopup};
