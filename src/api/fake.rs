//! In-memory backend used by tests.

use super::{
    Article, NewsApi, NewsCategory, NewsId, NewsSummary, Quiz, QuizId, QuizResult, Term,
    TermBrief, TermDetail, TermId,
};
use crate::session::{Credentials, Session, SignupForm};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn term(id: TermId, name: &str) -> Term {
    Term {
        term_id: id,
        term_name: name.to_string(),
        brief_explanation: None,
        detailed_explanation: None,
    }
}

pub fn article(content: &str) -> Article {
    Article {
        news_id: Some(1),
        title: "기준금리 인상".to_string(),
        news_category: Some("FINANCE".to_string()),
        source: "연합뉴스".to_string(),
        published_at: "2025-03-01T09:30:00".to_string(),
        full_content: content.to_string(),
        news_img_url: None,
    }
}

fn failure(endpoint: &str) -> Error {
    Error::Api {
        endpoint: endpoint.to_string(),
        code: "TEST500".to_string(),
        message: "scripted failure".to_string(),
    }
}

/// Scripted `NewsApi`. Term responses are served from a queue; once the queue
/// is drained the last response repeats.
#[derive(Default)]
pub struct FakeApi {
    term_responses: Mutex<VecDeque<Option<Vec<Term>>>>,
    last_terms: Mutex<Vec<Term>>,
    term_calls: AtomicUsize,
    term_gate: Option<Arc<Notify>>,
    pub article: Option<Article>,
    pub briefs: HashMap<TermId, TermBrief>,
    pub news: Vec<NewsSummary>,
    pub dictionary: Vec<Term>,
    pub quizzes: Vec<Quiz>,
    pub generate_calls: AtomicUsize,
    /// Registered `(email, password)` pairs. Signups are appended.
    pub accounts: Mutex<Vec<(String, String)>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one poll response. `None` makes that poll fail.
    pub fn push_terms(self, terms: Option<Vec<Term>>) -> Self {
        self.term_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(terms);
        self
    }

    /// Makes every term fetch wait until the returned `Notify` fires.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.term_gate = Some(gate.clone());
        (self, gate)
    }

    pub fn with_brief(mut self, id: TermId, name: &str, brief: &str) -> Self {
        self.briefs.insert(
            id,
            TermBrief {
                term_id: id,
                term_name: name.to_string(),
                brief_explanation: brief.to_string(),
            },
        );
        self
    }

    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.accounts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((email.to_string(), password.to_string()));
        self
    }

    pub fn term_calls(&self) -> usize {
        self.term_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsApi for FakeApi {
    async fn news_list(&self, _category: NewsCategory, _page: u32) -> Result<Vec<NewsSummary>> {
        Ok(self.news.clone())
    }

    async fn news_detail(&self, _news_id: NewsId) -> Result<Article> {
        self.article.clone().ok_or_else(|| failure("news_detail"))
    }

    async fn news_terms(&self, _news_id: NewsId) -> Result<Vec<Term>> {
        self.term_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.term_gate {
            gate.notified().await;
        }

        let next = self
            .term_responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let mut last = self.last_terms.lock().unwrap_or_else(|e| e.into_inner());
        match next {
            Some(Some(terms)) => {
                *last = terms.clone();
                Ok(terms)
            }
            Some(None) => Err(failure("news_terms")),
            None => Ok(last.clone()),
        }
    }

    async fn generate_terms(&self, _news_id: NewsId) -> Result<()> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn term_brief(&self, term_id: TermId) -> Result<TermBrief> {
        self.briefs
            .get(&term_id)
            .cloned()
            .ok_or_else(|| failure("term_brief"))
    }

    async fn term_list(&self) -> Result<Vec<Term>> {
        Ok(self.dictionary.clone())
    }

    async fn term_detail(&self, term_id: TermId) -> Result<TermDetail> {
        self.dictionary
            .iter()
            .find(|t| t.term_id == term_id)
            .map(|t| TermDetail {
                term_id: t.term_id,
                term_name: t.term_name.clone(),
                detailed_explanation: t.detailed_explanation.clone().unwrap_or_default(),
            })
            .ok_or_else(|| failure("term_detail"))
    }

    async fn generate_quiz(&self, _news_id: NewsId) -> Result<Vec<Quiz>> {
        Ok(self.quizzes.clone())
    }

    async fn submit_quiz(&self, quiz_id: QuizId, answer: &str) -> Result<QuizResult> {
        let quiz = self
            .quizzes
            .iter()
            .find(|q| q.id == quiz_id)
            .ok_or_else(|| failure("submit_quiz"))?;
        let correct_answer = quiz
            .quiz_option_list
            .iter()
            .find(|o| o.is_correct == Some(true))
            .map(|o| o.option_text.clone());
        Ok(QuizResult {
            correct: correct_answer.as_deref() == Some(answer),
            member_answer: Some(answer.to_string()),
            correct_answer,
            explanation: quiz.explanation.clone(),
        })
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let index = accounts
            .iter()
            .position(|(email, password)| {
                *email == credentials.email && *password == credentials.password
            })
            .ok_or_else(|| failure("login"))?;
        Ok(Session {
            access_token: format!("token-{}", index + 1),
            member_id: Some((index + 1).to_string()),
        })
    }

    async fn signup(&self, form: &SignupForm) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        if accounts.iter().any(|(email, _)| *email == form.email) {
            return Err(failure("signup"));
        }
        accounts.push((form.email.clone(), form.password.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signup_then_login() {
        let api = FakeApi::new().with_account("taken@example.com", "pw");
        let form = SignupForm {
            email: "new@example.com".to_string(),
            password: "secret".to_string(),
            name: "홍길동".to_string(),
            nickname: "gildong".to_string(),
        };

        api.signup(&form).await.unwrap();
        let session = api.login(&form.credentials()).await.unwrap();
        assert_eq!(session.member_id.as_deref(), Some("2"));

        let duplicate = SignupForm {
            email: "taken@example.com".to_string(),
            ..form
        };
        assert!(api.signup(&duplicate).await.is_err());

        let wrong = Credentials {
            email: "new@example.com".to_string(),
            password: "nope".to_string(),
        };
        assert!(matches!(
            api.login(&wrong).await,
            Err(Error::Api { ref endpoint, .. }) if endpoint == "login"
        ));
    }
}
