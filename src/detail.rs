use crate::api::{Article, NewsApi, NewsId, Term};
use crate::terms::{HighlightedDocument, PollEvent, PopupState, SessionId, StopReason, TermPopup};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollStatus {
    #[default]
    Idle,
    Polling,
    Done(StopReason),
}

/// State of the article view: the article, its observed term set, the
/// highlighted body derived from both, and the term popup.
#[derive(Debug)]
pub struct ArticleDetail {
    news_id: NewsId,
    article: Option<Article>,
    terms: Vec<Term>,
    document: HighlightedDocument,
    popup: TermPopup,
    session: Option<SessionId>,
    poll_status: PollStatus,
}

impl ArticleDetail {
    pub fn new(news_id: NewsId) -> Self {
        Self {
            news_id,
            article: None,
            terms: Vec::new(),
            document: HighlightedDocument::default(),
            popup: TermPopup::new(),
            session: None,
            poll_status: PollStatus::Idle,
        }
    }

    pub fn news_id(&self) -> NewsId {
        self.news_id
    }

    pub fn article(&self) -> Option<&Article> {
        self.article.as_ref()
    }

    /// No article yet. A failed article fetch leaves the view here.
    pub fn is_loading(&self) -> bool {
        self.article.is_none()
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn document(&self) -> &HighlightedDocument {
        &self.document
    }

    pub fn popup(&self) -> &TermPopup {
        &self.popup
    }

    pub fn popup_mut(&mut self) -> &mut TermPopup {
        &mut self.popup
    }

    pub fn poll_status(&self) -> PollStatus {
        self.poll_status
    }

    pub fn set_article(&mut self, article: Article) {
        self.article = Some(article);
        self.rebuild();
    }

    /// Replaces the observed term set. A smaller set than before is accepted
    /// as is.
    pub fn set_terms(&mut self, terms: Vec<Term>) {
        if terms.len() < self.terms.len() {
            debug!(
                news_id = self.news_id,
                before = self.terms.len(),
                after = terms.len(),
                "term set shrank"
            );
        }
        self.terms = terms;
        self.rebuild();
    }

    /// Binds the view to a polling session. Events from any other session
    /// are ignored from now on.
    pub fn attach_session(&mut self, session: SessionId) {
        self.session = Some(session);
        self.poll_status = PollStatus::Polling;
    }

    /// Unbinds the current session, e.g. when the view is left.
    pub fn detach_session(&mut self) {
        self.session = None;
        if self.poll_status == PollStatus::Polling {
            self.poll_status = PollStatus::Done(StopReason::Cancelled);
        }
    }

    /// Applies a polling event if it belongs to this view's live session.
    /// Returns whether anything changed.
    pub fn apply_poll_event(&mut self, event: PollEvent) -> bool {
        if event.news_id() != self.news_id || Some(event.session()) != self.session {
            debug!(
                news_id = event.news_id(),
                session = event.session(),
                "dropping event from stale polling session"
            );
            return false;
        }

        match event {
            PollEvent::Terms { terms, .. } => {
                self.set_terms(terms);
            }
            PollEvent::Finished { reason, .. } => {
                self.poll_status = PollStatus::Done(reason);
            }
        }
        true
    }

    fn rebuild(&mut self) {
        let content = self
            .article
            .as_ref()
            .map(|a| a.full_content.as_str())
            .unwrap_or_default();
        self.document = HighlightedDocument::render(content, &self.terms);

        let stale = matches!(
            self.popup.state(),
            PopupState::Open { term, .. } if !self.terms.iter().any(|t| t.term_id == term.term_id)
        );
        if stale {
            self.popup.close();
        }
    }
}

/// Asks the backend to extract terms for an article without waiting for the
/// outcome. Failures are only logged.
pub fn trigger_term_generation(api: Arc<dyn NewsApi>, news_id: NewsId) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = api.generate_terms(news_id).await {
            warn!(news_id, "term generation request failed: {}", e);
        }
    })
}
