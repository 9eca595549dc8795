use crate::{Error, Result};
use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    #[serde(default, deserialize_with = "member_id_repr")]
    pub member_id: Option<String>,
}

/// The login endpoint sends `memberId` as a number, the redirect and the
/// session file as a string.
fn member_id_repr<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MemberId {
        Text(String),
        Number(u64),
    }

    Ok(Option::<MemberId>::deserialize(deserializer)?.map(|id| match id {
        MemberId::Text(text) => text,
        MemberId::Number(number) => number.to_string(),
    }))
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/auth/signup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub name: String,
    pub nickname: String,
}

impl SignupForm {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

impl Session {
    /// Builds a session from the URL the social login flow redirects to,
    /// e.g. `http://localhost:3000/login/success?token=abc&memberId=7`.
    pub fn from_redirect_url(redirect: &str) -> Result<Self> {
        let url =
            Url::parse(redirect).map_err(|e| Error::InvalidUrl(format!("{}: {}", redirect, e)))?;

        let mut token = None;
        let mut member_id = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "token" if !value.is_empty() => token = Some(value.into_owned()),
                "memberId" if !value.is_empty() => member_id = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(Self {
            access_token: token.ok_or(Error::MissingToken)?,
            member_id,
        })
    }
}

/// Session shared by everything that talks to the backend.
///
/// Cloning is cheap and every clone sees `init` and `clear` calls made
/// through any other clone.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(session: Option<Session>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
        }
    }

    pub fn init(&self, session: Session) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(session);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn current(&self) -> Option<Session> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Value for the `Authorization` header, if a token is present.
    pub fn bearer(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|s| !s.access_token.is_empty())
            .map(|s| format!("Bearer {}", s.access_token))
    }
}

/// Persists the session between runs as JSON.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("econews").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
