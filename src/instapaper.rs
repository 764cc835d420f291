use crate::error::SourceError;
use crate::model::Bookmark;
use crate::oauth::{self, Credentials};
use crate::source::{BookmarkSource, Folder};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://www.instapaper.com";

const ACCESS_TOKEN_PATH: &str = "/api/1/oauth/access_token";
const BOOKMARKS_LIST_PATH: &str = "/api/1/bookmarks/list";
const BOOKMARKS_ARCHIVE_PATH: &str = "/api/1/bookmarks/archive";

/// Client for the Instapaper Full API, authenticated via xAuth.
pub struct InstapaperClient {
    http: reqwest::Client,
    base_url: String,
    consumer: Credentials,
    token: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorPayload {
    error_code: i64,
    #[serde(default)]
    message: String,
}

impl InstapaperClient {
    pub fn new(consumer_key: &str, consumer_secret: &str) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("instapaper-archiver/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(InstapaperClient {
            http,
            base_url: DEFAULT_API_BASE.to_string(),
            consumer: Credentials::new(consumer_key, consumer_secret),
            token: None,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Exchanges the user's login and password for an access token.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), SourceError> {
        let params = vec![
            ("x_auth_username".to_string(), username.to_string()),
            ("x_auth_password".to_string(), password.to_string()),
            ("x_auth_mode".to_string(), "client_auth".to_string()),
        ];

        let body = match self.post(ACCESS_TOKEN_PATH, &params).await {
            Ok(body) => body,
            Err(SourceError::Status { code, body }) => {
                return Err(SourceError::Auth(format!("status {code}: {}", body.trim())));
            }
            Err(SourceError::Api { code, message }) => {
                return Err(SourceError::Auth(format!("error {code}: {message}")));
            }
            Err(e) => return Err(e),
        };

        self.token = Some(parse_token_response(&body)?);
        tracing::info!("authenticated with instapaper");
        Ok(())
    }

    async fn post(&self, path: &str, params: &[(String, String)]) -> Result<String, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let header =
            oauth::authorization_header(&self.consumer, self.token.as_ref(), "POST", &url, params)?;
        let header =
            HeaderValue::from_str(&header).map_err(|e| SourceError::Signing(e.to_string()))?;

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, header)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            if let Some(err) = find_api_error(&body) {
                return Err(err);
            }
            return Err(SourceError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn require_token(&self) -> Result<(), SourceError> {
        match self.token {
            Some(_) => Ok(()),
            None => Err(SourceError::Auth("not logged in".to_string())),
        }
    }
}

#[async_trait]
impl BookmarkSource for InstapaperClient {
    async fn list_bookmarks(&self, folder: Folder, limit: u32) -> Result<Vec<Bookmark>, SourceError> {
        self.require_token()?;
        let params = vec![
            ("folder_id".to_string(), folder.as_str().to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        let body = self.post(BOOKMARKS_LIST_PATH, &params).await?;
        let bookmarks = parse_bookmark_list(&body)?;
        tracing::debug!(folder = %folder, count = bookmarks.len(), "fetched bookmarks");
        Ok(bookmarks)
    }

    async fn archive(&self, bookmark: &Bookmark) -> Result<(), SourceError> {
        self.require_token()?;
        let params = vec![("bookmark_id".to_string(), bookmark.bookmark_id.to_string())];
        let body = self.post(BOOKMARKS_ARCHIVE_PATH, &params).await?;
        if let Some(err) = find_api_error(&body) {
            return Err(err);
        }
        tracing::debug!(bookmark_id = bookmark.bookmark_id, "archived bookmark");
        Ok(())
    }
}

pub fn parse_token_response(body: &str) -> Result<Credentials, SourceError> {
    let mut key = None;
    let mut secret = None;
    for (k, v) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        match k.as_ref() {
            "oauth_token" => key = Some(v.into_owned()),
            "oauth_token_secret" => secret = Some(v.into_owned()),
            _ => {}
        }
    }

    match (key, secret) {
        (Some(key), Some(secret)) => Ok(Credentials { key, secret }),
        _ => Err(SourceError::Auth(format!(
            "access token response missing oauth_token/oauth_token_secret: {}",
            body.trim()
        ))),
    }
}

/// Keeps the `bookmark` items of a `bookmarks/list` response, in order.
pub fn parse_bookmark_list(body: &str) -> Result<Vec<Bookmark>, SourceError> {
    let items: Vec<JsonValue> = serde_json::from_str(body)
        .map_err(|e| SourceError::Decode(format!("bookmark list: {e}")))?;

    let mut bookmarks = Vec::new();
    for item in items {
        match item.get("type").and_then(JsonValue::as_str) {
            Some("bookmark") => {
                let bookmark: Bookmark = serde_json::from_value(item)
                    .map_err(|e| SourceError::Decode(format!("bookmark: {e}")))?;
                bookmarks.push(bookmark);
            }
            Some("error") => return Err(api_error(item)),
            _ => {}
        }
    }
    Ok(bookmarks)
}

fn find_api_error(body: &str) -> Option<SourceError> {
    let value: JsonValue = serde_json::from_str(body).ok()?;
    let items = match value {
        JsonValue::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .find(|item| item.get("type").and_then(JsonValue::as_str) == Some("error"))
        .map(api_error)
}

fn api_error(item: JsonValue) -> SourceError {
    match serde_json::from_value::<ApiErrorPayload>(item) {
        Ok(payload) => SourceError::Api {
            code: payload.error_code,
            message: payload.message,
        },
        Err(e) => SourceError::Decode(format!("error payload: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_access_token() {
        let creds = parse_token_response("oauth_token_secret=s%26cret&oauth_token=tok\n").unwrap();
        assert_eq!(creds.key, "tok");
        assert_eq!(creds.secret, "s&cret");
    }

    #[test]
    fn incomplete_access_token_is_auth_error() {
        let err = parse_token_response("oauth_token=tok").unwrap_err();
        assert!(matches!(err, SourceError::Auth(_)));
    }

    #[test]
    fn list_keeps_only_bookmarks_in_order() {
        let body = r#"[
            {"type": "meta"},
            {"type": "user", "user_id": 1, "username": "me"},
            {"type": "bookmark", "bookmark_id": 2, "url": "https://b.com", "title": "B", "time": 1700000100},
            {"type": "bookmark", "bookmark_id": 1, "url": "https://a.com", "title": "A", "time": 1700000000}
        ]"#;
        let bookmarks = parse_bookmark_list(body).unwrap();
        let ids: Vec<i64> = bookmarks.iter().map(|b| b.bookmark_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn list_surfaces_api_errors() {
        let body = r#"[{"type": "error", "error_code": 1041, "message": "Premium account required"}]"#;
        match parse_bookmark_list(body).unwrap_err() {
            SourceError::Api { code, message } => {
                assert_eq!(code, 1041);
                assert_eq!(message, "Premium account required");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn list_rejects_non_json() {
        assert!(matches!(
            parse_bookmark_list("<html>").unwrap_err(),
            SourceError::Decode(_)
        ));
    }

    #[test]
    fn finds_error_in_single_object() {
        let err = find_api_error(r#"{"type": "error", "error_code": 1500, "message": "oops"}"#);
        assert!(matches!(err, Some(SourceError::Api { code: 1500, .. })));
        assert!(find_api_error(r#"[{"type": "bookmark"}]"#).is_none());
        assert!(find_api_error("not json").is_none());
    }

    #[tokio::test]
    async fn calls_before_login_are_rejected() {
        let client = InstapaperClient::new("key", "secret").unwrap();
        assert!(!client.is_authenticated());
        let err = client.list_bookmarks(Folder::Unread, 10).await.unwrap_err();
        assert!(matches!(err, SourceError::Auth(_)));
    }
}
