pub mod client;
#[cfg(test)]
pub(crate) mod fake;

use crate::session::{Credentials, Session, SignupForm};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::ApiClient;

pub type NewsId = u64;
pub type TermId = u64;
pub type QuizId = u64;

/// Envelope wrapping every backend response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default = "default_success")]
    pub is_success: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub result: Option<T>,
}

fn default_success() -> bool {
    true
}

impl<T> ApiResponse<T> {
    pub fn into_result(self, endpoint: &str) -> Result<T> {
        if !self.is_success {
            return Err(Error::Api {
                endpoint: endpoint.to_string(),
                code: self.code.unwrap_or_default(),
                message: self.message.unwrap_or_default(),
            });
        }
        self.result
            .ok_or_else(|| Error::MissingResult(endpoint.to_string()))
    }

    /// Like `into_result` for calls whose result carries nothing we use.
    pub fn into_ack(self, endpoint: &str) -> Result<()> {
        if !self.is_success {
            return Err(Error::Api {
                endpoint: endpoint.to_string(),
                code: self.code.unwrap_or_default(),
                message: self.message.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewsCategory {
    #[default]
    Main,
    Finance,
    Stock,
    Industry,
    Venture,
    RealEstate,
    GlobalEconomy,
    Life,
    Normal,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 9] = [
        NewsCategory::Main,
        NewsCategory::Finance,
        NewsCategory::Stock,
        NewsCategory::Industry,
        NewsCategory::Venture,
        NewsCategory::RealEstate,
        NewsCategory::GlobalEconomy,
        NewsCategory::Life,
        NewsCategory::Normal,
    ];

    pub fn code(self) -> &'static str {
        match self {
            NewsCategory::Main => "MAIN",
            NewsCategory::Finance => "FINANCE",
            NewsCategory::Stock => "STOCK",
            NewsCategory::Industry => "INDUSTRY",
            NewsCategory::Venture => "VENTURE",
            NewsCategory::RealEstate => "REAL_ESTATE",
            NewsCategory::GlobalEconomy => "GLOBAL_ECONOMY",
            NewsCategory::Life => "LIFE",
            NewsCategory::Normal => "NORMAL",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            NewsCategory::Main => "경제",
            NewsCategory::Finance => "금융",
            NewsCategory::Stock => "증권",
            NewsCategory::Industry => "산업/재계",
            NewsCategory::Venture => "중기/벤처",
            NewsCategory::RealEstate => "부동산",
            NewsCategory::GlobalEconomy => "글로벌 경제",
            NewsCategory::Life => "생활경제",
            NewsCategory::Normal => "일반",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code.trim()))
    }

    /// Value for the `newsCategory` query parameter. `Main` lists everything.
    pub fn query_value(self) -> Option<&'static str> {
        match self {
            NewsCategory::Main => None,
            other => Some(other.code()),
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|c| *c == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Label for a raw category code as sent by the backend.
pub fn category_label(code: Option<&str>) -> &'static str {
    code.and_then(NewsCategory::from_code)
        .unwrap_or_default()
        .label()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsSummary {
    pub news_id: NewsId,
    pub title: String,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub news_category: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewsListView {
    #[serde(rename = "newsDTOList", default)]
    pub news: Vec<NewsSummary>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub news_id: Option<NewsId>,
    pub title: String,
    #[serde(default)]
    pub news_category: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub full_content: String,
    #[serde(default)]
    pub news_img_url: Option<String>,
}

impl Article {
    pub fn category_label(&self) -> &'static str {
        category_label(self.news_category.as_deref())
    }

    /// Publish time formatted for display. Falls back to the raw value when
    /// the backend sends something unparseable.
    pub fn published_display(&self) -> String {
        format_timestamp(&self.published_at)
    }
}

pub fn format_timestamp(raw: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, pattern) {
            return dt.format("%Y-%m-%d %H:%M").to_string();
        }
    }
    raw.to_string()
}

/// An economic term as attached to an article or listed in the dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub term_id: TermId,
    pub term_name: String,
    #[serde(default)]
    pub brief_explanation: Option<String>,
    #[serde(default)]
    pub detailed_explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TermListView {
    #[serde(default)]
    pub terms: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermBrief {
    pub term_id: TermId,
    pub term_name: String,
    #[serde(default)]
    pub brief_explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermDetail {
    pub term_id: TermId,
    pub term_name: String,
    #[serde(default)]
    pub detailed_explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum QuizType {
    #[serde(rename = "OX")]
    Ox,
    #[default]
    #[serde(other)]
    MultipleChoice,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub option_order: u32,
    pub option_text: String,
    #[serde(default)]
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: QuizId,
    #[serde(default)]
    pub quiz_type: QuizType,
    pub question: String,
    #[serde(default)]
    pub quiz_option_list: Vec<QuizOption>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    #[serde(default, alias = "isCorrect")]
    pub correct: bool,
    #[serde(default)]
    pub member_answer: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizAnswer<'a> {
    pub answer: &'a str,
}

/// Every backend call the client makes.
#[async_trait]
pub trait NewsApi: Send + Sync {
    async fn news_list(&self, category: NewsCategory, page: u32) -> Result<Vec<NewsSummary>>;

    async fn news_detail(&self, news_id: NewsId) -> Result<Article>;

    /// Current term set extracted for an article. Polled while extraction runs.
    async fn news_terms(&self, news_id: NewsId) -> Result<Vec<Term>>;

    /// Asks the backend to start term extraction. Returns once the request is
    /// accepted, not when extraction finishes.
    async fn generate_terms(&self, news_id: NewsId) -> Result<()>;

    async fn term_brief(&self, term_id: TermId) -> Result<TermBrief>;

    async fn term_list(&self) -> Result<Vec<Term>>;

    async fn term_detail(&self, term_id: TermId) -> Result<TermDetail>;

    async fn generate_quiz(&self, news_id: NewsId) -> Result<Vec<Quiz>>;

    async fn submit_quiz(&self, quiz_id: QuizId, answer: &str) -> Result<QuizResult>;

    /// Email/password login. The envelope's `result` is the new session.
    async fn login(&self, credentials: &Credentials) -> Result<Session>;

    /// Creates an account. Does not log in.
    async fn signup(&self, form: &SignupForm) -> Result<()>;
}
