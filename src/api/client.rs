use super::{
    ApiResponse, Article, NewsApi, NewsCategory, NewsId, NewsListView, NewsSummary, Quiz,
    QuizAnswer, QuizId, QuizResult, Term, TermBrief, TermDetail, TermId, TermListView,
};
use crate::config::{ApiConfig, NewsConfig};
use crate::session::{Credentials, Session, SessionContext, SignupForm};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP client for the news backend. Attaches the session's bearer token to
/// every request when one is present.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    page_size: u32,
    session: SessionContext,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(api: &ApiConfig, news: &NewsConfig, session: SessionContext) -> Result<Self> {
        let base_url = Url::parse(&api.base_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", api.base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(api.timeout_secs.max(1)))
            .user_agent(concat!("econews/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url,
            page_size: news.page_size.max(1),
            session,
            client,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{}{}: {}", self.base_url, path, e)))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let mut builder = self.client.request(method, self.url(path)?);
        if let Some(bearer) = self.session.bearer() {
            builder = builder.header(reqwest::header::AUTHORIZATION, bearer);
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder, endpoint: &str) -> Result<reqwest::Response> {
        debug!(endpoint, "sending request");
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                endpoint: endpoint.to_string(),
                status,
            });
        }
        Ok(response)
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder, endpoint: &str) -> Result<T> {
        let response = self.send(builder, endpoint).await?;
        let body = response.text().await?;
        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        envelope.into_result(endpoint)
    }

    async fn fetch_ack(&self, builder: RequestBuilder, endpoint: &str) -> Result<()> {
        let response = self.send(builder, endpoint).await?;
        let body = response.text().await?;
        let envelope: ApiResponse<serde_json::Value> = serde_json::from_str(&body)?;
        envelope.into_ack(endpoint)
    }

    pub(crate) fn login_request(&self, credentials: &Credentials) -> Result<RequestBuilder> {
        Ok(self
            .request(Method::POST, "/api/auth/login")?
            .json(credentials))
    }

    pub(crate) fn signup_request(&self, form: &SignupForm) -> Result<RequestBuilder> {
        Ok(self.request(Method::POST, "/api/auth/signup")?.json(form))
    }

    pub(crate) fn news_list_query(&self, category: NewsCategory, page: u32) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", page.to_string()),
            ("size", self.page_size.to_string()),
        ];
        if let Some(code) = category.query_value() {
            query.push(("newsCategory", code.to_string()));
        }
        query
    }
}

#[async_trait]
impl NewsApi for ApiClient {
    async fn news_list(&self, category: NewsCategory, page: u32) -> Result<Vec<NewsSummary>> {
        let builder = self
            .request(Method::GET, "/api/news")?
            .query(&self.news_list_query(category, page));
        let view: NewsListView = self.fetch(builder, "news_list").await?;
        Ok(view.news)
    }

    async fn news_detail(&self, news_id: NewsId) -> Result<Article> {
        let builder = self.request(Method::GET, &format!("/api/news/{}", news_id))?;
        self.fetch(builder, "news_detail").await
    }

    async fn news_terms(&self, news_id: NewsId) -> Result<Vec<Term>> {
        let builder = self.request(Method::GET, &format!("/api/news/{}/term", news_id))?;
        let view: TermListView = self.fetch(builder, "news_terms").await?;
        Ok(view.terms)
    }

    async fn generate_terms(&self, news_id: NewsId) -> Result<()> {
        let builder = self.request(Method::POST, &format!("/api/news/{}/generateTerm", news_id))?;
        self.send(builder, "generate_terms").await?;
        Ok(())
    }

    async fn term_brief(&self, term_id: TermId) -> Result<TermBrief> {
        let builder = self.request(Method::GET, &format!("/api/term/{}/brief", term_id))?;
        self.fetch(builder, "term_brief").await
    }

    async fn term_list(&self) -> Result<Vec<Term>> {
        let builder = self.request(Method::GET, "/api/term")?;
        let view: TermListView = self.fetch(builder, "term_list").await?;
        Ok(view.terms)
    }

    async fn term_detail(&self, term_id: TermId) -> Result<TermDetail> {
        let builder = self.request(Method::GET, &format!("/api/term/{}", term_id))?;
        self.fetch(builder, "term_detail").await
    }

    async fn generate_quiz(&self, news_id: NewsId) -> Result<Vec<Quiz>> {
        let builder = self.request(Method::POST, &format!("/api/quiz/generate/{}", news_id))?;
        self.fetch(builder, "generate_quiz").await
    }

    async fn submit_quiz(&self, quiz_id: QuizId, answer: &str) -> Result<QuizResult> {
        let builder = self
            .request(Method::POST, &format!("/api/quiz/{}/submit", quiz_id))?
            .json(&QuizAnswer { answer });
        self.fetch(builder, "submit_quiz").await
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let session: Session = self.fetch(self.login_request(credentials)?, "login").await?;
        info!(email = %credentials.email, "logged in");
        Ok(session)
    }

    async fn signup(&self, form: &SignupForm) -> Result<()> {
        self.fetch_ack(self.signup_request(form)?, "signup").await?;
        info!(email = %form.email, "account created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(session: SessionContext) -> ApiClient {
        let api = ApiConfig {
            base_url: "http://news.example.com:8080".to_string(),
            timeout_secs: 5,
        };
        ApiClient::new(&api, &NewsConfig::default(), session).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_base_url() {
        let api = ApiConfig {
            base_url: "::not a url".to_string(),
            timeout_secs: 5,
        };
        let err = ApiClient::new(&api, &NewsConfig::default(), SessionContext::anonymous()).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_url_join() {
        let client = client(SessionContext::anonymous());
        assert_eq!(client.base_url().as_str(), "http://news.example.com:8080/");
        assert_eq!(
            client.url("/api/news/5/term").unwrap().as_str(),
            "http://news.example.com:8080/api/news/5/term"
        );
    }

    #[test]
    fn test_news_list_query_omits_main_category() {
        let client = client(SessionContext::anonymous());
        let query = client.news_list_query(NewsCategory::Main, 2);
        assert_eq!(
            query,
            vec![("page", "2".to_string()), ("size", "12".to_string())]
        );

        let query = client.news_list_query(NewsCategory::Stock, 0);
        assert!(query.contains(&("newsCategory", "STOCK".to_string())));
    }

    #[test]
    fn test_auth_requests_post_json_bodies() {
        let client = client(SessionContext::anonymous());

        let request = client
            .login_request(&Credentials {
                email: "kim@example.com".to_string(),
                password: "pw".to_string(),
            })
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.url().path(), "/api/auth/login");
        let body: serde_json::Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"email": "kim@example.com", "password": "pw"})
        );

        let request = client
            .signup_request(&SignupForm {
                email: "kim@example.com".to_string(),
                password: "pw".to_string(),
                name: "김경제".to_string(),
                nickname: "econ".to_string(),
            })
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().path(), "/api/auth/signup");
        assert_eq!(
            request.headers().get(reqwest::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_request_attaches_bearer_only_when_logged_in() {
        let session = SessionContext::anonymous();
        let client = client(session.clone());

        let request = client.request(Method::GET, "/api/term/1/brief").unwrap().build().unwrap();
        assert!(request.headers().get(reqwest::header::AUTHORIZATION).is_none());

        session.init(Session {
            access_token: "tok".to_string(),
            member_id: None,
        });
        assert!(client.session().is_authenticated());
        let request = client.request(Method::GET, "/api/term/1/brief").unwrap().build().unwrap();
        assert_eq!(
            request.headers().get(reqwest::header::AUTHORIZATION).unwrap(),
            "Bearer tok"
        );
    }
}
