//! # OAuth
//!
//! Authorization-code sign in with GitHub and Google.
//!
//! Flow: `authorize_url` → provider redirects back with `code` →
//! `exchange_code` → `fetch_profile`.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned no access token: {0}")]
    NoAccessToken(String),

    #[error("provider returned no email address")]
    NoEmail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    GitHub,
    Google,
}

impl ProviderKind {
    /// Path segment under `/v1/auth/`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Google => "google",
        }
    }

    fn scope(self) -> &'static str {
        match self {
            Self::GitHub => "user:email",
            Self::Google => "https://www.googleapis.com/auth/userinfo.email",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider URLs. `emails` is only used by GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize: String,
    pub token: String,
    pub profile: String,
    pub emails: Option<String>,
}

impl Endpoints {
    /// The public endpoints of `kind`.
    pub fn for_kind(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::GitHub => Self {
                authorize: "https://github.com/login/oauth/authorize".to_string(),
                token: "https://github.com/login/oauth/access_token".to_string(),
                profile: "https://api.github.com/user".to_string(),
                emails: Some("https://api.github.com/user/emails".to_string()),
            },
            ProviderKind::Google => Self {
                authorize: "https://accounts.google.com/o/oauth2/auth".to_string(),
                token: "https://oauth2.googleapis.com/token".to_string(),
                profile: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
                emails: None,
            },
        }
    }

    /// The provider's paths rooted at `base` instead of its public hosts.
    pub fn rooted_at(kind: ProviderKind, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        match kind {
            ProviderKind::GitHub => Self {
                authorize: format!("{base}/login/oauth/authorize"),
                token: format!("{base}/login/oauth/access_token"),
                profile: format!("{base}/user"),
                emails: Some(format!("{base}/user/emails")),
            },
            ProviderKind::Google => Self {
                authorize: format!("{base}/o/oauth2/auth"),
                token: format!("{base}/token"),
                profile: format!("{base}/oauth2/v2/userinfo"),
                emails: None,
            },
        }
    }
}

/// Who signed in, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub name: String,
    pub email: String,
    pub avatar_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct GitHubUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    login: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar_url: String,
}

#[derive(Deserialize)]
struct GitHubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
}

#[derive(Deserialize)]
struct GoogleUser {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    picture: String,
}

/// A configured provider.
#[derive(Debug, Clone)]
pub struct OAuthProvider {
    kind: ProviderKind,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    endpoints: Endpoints,
    http: reqwest::Client,
}

impl OAuthProvider {
    pub fn new(
        kind: ProviderKind,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        public_base: &str,
    ) -> Self {
        Self {
            kind,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: format!("{public_base}/v1/auth/{}/callback", kind.as_str()),
            endpoints: Endpoints::for_kind(kind),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .user_agent(concat!("lodgely/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
        }
    }

    /// The provider if both its client id and secret are configured.
    pub fn from_config(kind: ProviderKind, config: &Config) -> Option<Self> {
        let (id, secret) = match kind {
            ProviderKind::GitHub => (&config.github_client_id, &config.github_client_secret),
            ProviderKind::Google => (&config.google_client_id, &config.google_client_secret),
        };
        match (id.as_deref(), secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(Self::new(kind, id, secret, config.public_base()))
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Where to send the browser to start sign in.
    pub fn authorize_url(&self, state: &str) -> String {
        let mut url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.endpoints.authorize,
            encode(&self.client_id),
            encode(&self.redirect_uri),
            encode(self.kind.scope()),
            encode(state),
        );
        if self.kind == ProviderKind::Google {
            url.push_str("&access_type=offline");
        }
        url
    }

    /// Trade an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response: TokenResponse = self
            .http
            .post(&self.endpoints.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(OAuthError::NoAccessToken(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }

    /// Look up the signed in account.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<OAuthProfile, OAuthError> {
        let profile = match self.kind {
            ProviderKind::GitHub => self.github_profile(access_token).await?,
            ProviderKind::Google => {
                let user: GoogleUser = self
                    .http
                    .get(&self.endpoints.profile)
                    .query(&[("fields", "email,name,picture")])
                    .bearer_auth(access_token)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                OAuthProfile {
                    name: user.name,
                    email: user.email,
                    avatar_url: user.picture,
                }
            }
        };
        if profile.email.is_empty() {
            return Err(OAuthError::NoEmail);
        }
        Ok(profile)
    }

    async fn github_profile(&self, access_token: &str) -> Result<OAuthProfile, OAuthError> {
        let user: GitHubUser = self
            .http
            .get(&self.endpoints.profile)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut email = user.email.unwrap_or_default();
        // Private addresses are only listed on /user/emails.
        if let (true, Some(emails_url)) = (email.is_empty(), &self.endpoints.emails) {
            let emails: Vec<GitHubEmail> = self
                .http
                .get(emails_url)
                .bearer_auth(access_token)
                .header(reqwest::header::ACCEPT, "application/vnd.github+json")
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            email = primary_email(emails).unwrap_or_default();
        }

        Ok(OAuthProfile {
            name: user.name.filter(|n| !n.is_empty()).unwrap_or(user.login),
            email,
            avatar_url: user.avatar_url,
        })
    }
}

fn primary_email(emails: Vec<GitHubEmail>) -> Option<String> {
    emails.into_iter().find(|e| e.primary).map(|e| e.email)
}

/// Percent-encode a query component (RFC 3986 unreserved set kept).
fn encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn authorize_url_for_github() {
        let provider = OAuthProvider::new(
            ProviderKind::GitHub,
            "client-1",
            "secret",
            "http://localhost:8080",
        );
        assert_eq!(
            provider.redirect_uri(),
            "http://localhost:8080/v1/auth/github/callback"
        );
        let url = provider.authorize_url("s t");
        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fv1%2Fauth%2Fgithub%2Fcallback"
        ));
        assert!(url.contains("scope=user%3Aemail"));
        assert!(url.contains("state=s%20t"));
        assert!(!url.contains("access_type"));
    }

    #[test]
    fn authorize_url_for_google_requests_offline_access() {
        let provider =
            OAuthProvider::new(ProviderKind::Google, "id", "secret", "https://api.example.com");
        let url = provider.authorize_url("abc");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.ends_with("&access_type=offline"));
    }

    #[test]
    fn provider_requires_id_and_secret() {
        let mut config = Config::default();
        assert!(OAuthProvider::from_config(ProviderKind::GitHub, &config).is_none());

        config.github_client_id = Some("id".into());
        assert!(OAuthProvider::from_config(ProviderKind::GitHub, &config).is_none());

        config.github_client_secret = Some("secret".into());
        let provider = OAuthProvider::from_config(ProviderKind::GitHub, &config).unwrap();
        assert_eq!(provider.kind(), ProviderKind::GitHub);
        assert!(OAuthProvider::from_config(ProviderKind::Google, &config).is_none());
    }

    #[test]
    fn endpoints_can_be_rerooted() {
        let github = Endpoints::rooted_at(ProviderKind::GitHub, "http://127.0.0.1:9000/");
        assert_eq!(github.token, "http://127.0.0.1:9000/login/oauth/access_token");
        assert_eq!(github.emails.as_deref(), Some("http://127.0.0.1:9000/user/emails"));

        let google = Endpoints::rooted_at(ProviderKind::Google, "http://mock");
        assert_eq!(google.profile, "http://mock/oauth2/v2/userinfo");
        assert!(google.emails.is_none());

        let provider = OAuthProvider::new(ProviderKind::Google, "id", "secret", "http://x")
            .with_endpoints(google);
        assert!(provider.authorize_url("s").starts_with("http://mock/o/oauth2/auth?"));
    }

    #[test]
    fn picks_primary_github_email() {
        let emails = vec![
            GitHubEmail {
                email: "old@example.com".into(),
                primary: false,
            },
            GitHubEmail {
                email: "main@example.com".into(),
                primary: true,
            },
        ];
        assert_eq!(primary_email(emails).as_deref(), Some("main@example.com"));
        assert_eq!(primary_email(Vec::new()), None);
    }

    #[test]
    fn encode_keeps_unreserved() {
        assert_eq!(encode("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(encode("a/b c"), "a%2Fb%20c");
    }
}
