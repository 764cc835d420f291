//! OAuth 1.0a request signing (HMAC-SHA1), as required by the Instapaper
//! Full API. Only the header-based flavour is implemented.

use crate::error::SourceError;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(key: &str, secret: &str) -> Self {
        Credentials {
            key: key.to_owned(),
            secret: secret.to_owned(),
        }
    }
}

/// RFC 3986 percent-encoding; everything but unreserved characters is escaped.
pub fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&param_string)
    )
}

pub fn sign(
    base_string: &str,
    consumer_secret: &str,
    token_secret: Option<&str>,
) -> Result<String, SourceError> {
    let key = format!(
        "{}&{}",
        encode(consumer_secret),
        encode(token_secret.unwrap_or(""))
    );
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
        .map_err(|e| SourceError::Signing(e.to_string()))?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Builds the `Authorization` header value for a request whose form/query
/// parameters are `params`.
pub fn authorization_header(
    consumer: &Credentials,
    token: Option<&Credentials>,
    method: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String, SourceError> {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let timestamp = Utc::now().timestamp().to_string();
    authorization_header_with(consumer, token, method, url, params, &nonce, &timestamp)
}

pub fn authorization_header_with(
    consumer: &Credentials,
    token: Option<&Credentials>,
    method: &str,
    url: &str,
    params: &[(String, String)],
    nonce: &str,
    timestamp: &str,
) -> Result<String, SourceError> {
    let mut oauth: Vec<(String, String)> = vec![
        ("oauth_consumer_key".to_string(), consumer.key.clone()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];
    if let Some(token) = token {
        oauth.push(("oauth_token".to_string(), token.key.clone()));
    }

    let mut all = oauth.clone();
    all.extend(params.iter().cloned());
    let base = signature_base_string(method, url, &all);
    let signature = sign(&base, &consumer.secret, token.map(|t| t.secret.as_str()))?;
    oauth.push(("oauth_signature".to_string(), signature));

    let fields = oauth
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_params() -> Vec<(String, String)> {
        vec![
            (
                "status".to_string(),
                "Hello Ladies + Gentlemen, a signed OAuth request!".to_string(),
            ),
            ("include_entities".to_string(), "true".to_string()),
            (
                "oauth_consumer_key".to_string(),
                "xvz1evFS4wEEPTGEFPHBog".to_string(),
            ),
            (
                "oauth_nonce".to_string(),
                "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg".to_string(),
            ),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), "1318622958".to_string()),
            (
                "oauth_token".to_string(),
                "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            ),
            ("oauth_version".to_string(), "1.0".to_string()),
        ]
    }

    const REFERENCE_URL: &str = "https://api.twitter.com/1.1/statuses/update.json";

    #[test]
    fn encode_escapes_reserved_characters() {
        assert_eq!(encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(encode("!*'()"), "%21%2A%27%28%29");
    }

    #[test]
    fn base_string_sorts_and_double_encodes() {
        let base = signature_base_string("post", REFERENCE_URL, &reference_params());
        assert!(base.starts_with(
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26oauth_consumer_key%3D"
        ));
        assert!(base.ends_with("%26status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521"));
    }

    #[test]
    fn matches_published_reference_signature() {
        let base = signature_base_string("POST", REFERENCE_URL, &reference_params());
        let signature = sign(
            &base,
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            Some("LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE"),
        )
        .unwrap();
        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn header_carries_oauth_fields_but_not_request_params() {
        let consumer = Credentials::new("ckey", "csecret");
        let token = Credentials::new("tkey", "tsecret");
        let params = vec![("bookmark_id".to_string(), "42".to_string())];
        let header = authorization_header_with(
            &consumer,
            Some(&token),
            "POST",
            "https://www.instapaper.com/api/1/bookmarks/archive",
            &params,
            "nonce",
            "1700000000",
        )
        .unwrap();

        assert!(header.starts_with("OAuth oauth_consumer_key=\"ckey\", oauth_nonce=\"nonce\""));
        assert!(header.contains("oauth_token=\"tkey\""));
        assert!(header.contains("oauth_signature=\""));
        assert!(!header.contains("bookmark_id"));
    }

    #[test]
    fn header_without_token_omits_oauth_token() {
        let consumer = Credentials::new("ckey", "csecret");
        let header = authorization_header(
            &consumer,
            None,
            "POST",
            "https://www.instapaper.com/api/1/oauth/access_token",
            &[],
        )
        .unwrap();
        assert!(!header.contains("oauth_token="));
    }
}
