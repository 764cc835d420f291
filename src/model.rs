use anyhow::{Result, anyhow};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub bookmark_id: i64,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "time", deserialize_with = "unix_seconds")]
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(bookmark_id: i64, url: &str, title: &str, created_at: DateTime<Utc>) -> Self {
        Bookmark {
            bookmark_id,
            url: url.to_owned(),
            title: title.to_owned(),
            created_at,
        }
    }

    /// Lowercase hostname of the bookmark's URL with any leading `www.` removed.
    pub fn domain(&self) -> Result<String> {
        domain_from_url(&self.url)
    }
}

pub fn domain_from_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw).map_err(|e| anyhow!("invalid bookmark url {raw:?}: {e}"))?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| anyhow!("bookmark url has no hostname: {raw:?}"))?;
    Ok(normalize_domain(host))
}

/// Lowercases a hostname, decodes punycode labels to Unicode and strips one
/// leading `www.`. URL hosts and rule keys both go through here, so
/// `xn--bcher-kva.de` and `Bücher.de` compare equal.
pub fn normalize_domain(host: &str) -> String {
    let host = host.trim().to_lowercase();
    let host = match idna::domain_to_unicode(&host) {
        (unicode, Ok(())) => unicode,
        _ => host,
    };
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}

// Instapaper reports `time` as Unix seconds, sometimes as a float.
fn unix_seconds<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Utc.timestamp_opt(secs.trunc() as i64, 0)
        .single()
        .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_www_prefix() {
        assert_eq!(domain_from_url("https://www.example.com/foo").unwrap(), "example.com");
    }

    #[test]
    fn keeps_subdomains() {
        assert_eq!(domain_from_url("http://sub.example.org").unwrap(), "sub.example.org");
    }

    #[test]
    fn lowercases_host() {
        assert_eq!(domain_from_url("https://EXAMPLE.com").unwrap(), "example.com");
        assert_eq!(domain_from_url("https://WWW.Example.COM/a?b=c").unwrap(), "example.com");
    }

    #[test]
    fn only_one_www_is_stripped() {
        assert_eq!(domain_from_url("https://www.www.example.com").unwrap(), "www.example.com");
        assert_eq!(domain_from_url("https://wwwexample.com").unwrap(), "wwwexample.com");
    }

    #[test]
    fn internationalized_hosts_are_unicode() {
        assert_eq!(domain_from_url("https://bücher.de/x").unwrap(), "bücher.de");
        assert_eq!(domain_from_url("https://www.xn--bcher-kva.de").unwrap(), "bücher.de");
        assert_eq!(normalize_domain("Bücher.DE"), "bücher.de");
        assert_eq!(normalize_domain("xn--bcher-kva.de"), "bücher.de");
    }

    #[test]
    fn url_without_host_is_an_error() {
        assert!(domain_from_url("mailto:someone@example.com").is_err());
        assert!(domain_from_url("not a url").is_err());
    }

    #[test]
    fn deserializes_api_bookmark() {
        let raw = r#"{
            "type": "bookmark",
            "bookmark_id": 1234,
            "url": "https://www.example.com/post",
            "title": "A post",
            "time": 1700000000,
            "progress": 0.0
        }"#;
        let b: Bookmark = serde_json::from_str(raw).unwrap();
        assert_eq!(b.bookmark_id, 1234);
        assert_eq!(b.title, "A post");
        assert_eq!(b.created_at, Utc.timestamp_opt(1700000000, 0).unwrap());
        assert_eq!(b.domain().unwrap(), "example.com");
    }

    #[test]
    fn missing_title_defaults_to_empty() {
        let raw = r#"{"bookmark_id": 1, "url": "https://a.com", "time": 1.5}"#;
        let b: Bookmark = serde_json::from_str(raw).unwrap();
        assert_eq!(b.title, "");
        assert_eq!(b.created_at.timestamp(), 1);
    }
}
