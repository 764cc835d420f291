//! Retention rules: how old an unread bookmark may get before it is archived.
//!
//! A [`RuleSet`] is built once per run from the command line defaults and an
//! optional rules document, and is read-only afterwards.
//!
//! ```json
//! {
//!     "max_age": 90,                 // days, required
//!     "domain_specific": [           // required, may be empty
//!         {"domain": "news.example", "max_age": 7},
//!     ],
//! }
//! ```

use crate::model::normalize_domain;
use chrono::TimeDelta;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read rules file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rules file {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Spec(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRule {
    pub domain: String,
    pub max_age_days: i64,
}

/// A fully validated rules document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesDocument {
    pub max_age_days: i64,
    pub domain_specific: Vec<DomainRule>,
}

impl RulesDocument {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw).map_err(|e| match e {
            RulesError::Parse { source, .. } => RulesError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// Parses a JSON document that may contain comments and trailing commas.
    pub fn parse(raw: &str) -> Result<Self, RulesError> {
        let cleaned = strip_trailing_commas(&strip_comments(raw));
        let value: JsonValue = serde_json::from_str(&cleaned).map_err(|source| RulesError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        Self::from_value(&value)
    }

    /// Validates the whole document before anything is returned, so a bad
    /// entry never leaves a half-applied rule set behind.
    pub fn from_value(value: &JsonValue) -> Result<Self, RulesError> {
        let obj = value
            .as_object()
            .ok_or_else(|| RulesError::Spec("Rules file must contain a JSON object.".to_string()))?;

        let max_age = obj.get("max_age").ok_or_else(|| {
            RulesError::Spec("Rules file must contain a global max_age specification.".to_string())
        })?;
        let max_age_days = as_days(max_age).ok_or_else(|| {
            RulesError::Spec(format!("Global max_age must be an integer, got {max_age}."))
        })?;

        let entries = obj
            .get("domain_specific")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| {
                RulesError::Spec("Rules file must contain a domain_specific rules list.".to_string())
            })?;

        let mut domain_specific = Vec::with_capacity(entries.len());
        for entry in entries {
            let missing =
                || RulesError::Spec(format!("Domain rule {entry} must include a domain and max_age."));
            let domain = entry.get("domain").ok_or_else(missing)?;
            let max_age = entry.get("max_age").ok_or_else(missing)?;

            let domain = domain.as_str().ok_or_else(|| {
                RulesError::Spec(format!("Domain rule {entry} has a non-string domain."))
            })?;
            let max_age_days = as_days(max_age).ok_or_else(|| {
                RulesError::Spec(format!("Domain rule {entry} has a non-integer max_age."))
            })?;

            domain_specific.push(DomainRule {
                domain: domain.to_string(),
                max_age_days,
            });
        }

        Ok(RulesDocument {
            max_age_days,
            domain_specific,
        })
    }
}

// Accepts integers, integral floats and numeric strings.
fn as_days(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    default_max_age_days: i64,
    domain_overrides: HashMap<String, i64>,
    only_domain: Option<String>,
}

impl RuleSet {
    pub fn new(default_max_age_days: i64, only_domain: Option<&str>) -> Self {
        RuleSet {
            default_max_age_days,
            domain_overrides: HashMap::new(),
            only_domain: only_domain.map(normalize_domain),
        }
    }

    /// Builds the final rule set for a run. A document replaces the default
    /// max age entirely; `only_domain` applies on top either way.
    pub fn build(
        default_max_age_days: i64,
        only_domain: Option<&str>,
        document: Option<RulesDocument>,
    ) -> Self {
        let mut rules = RuleSet::new(default_max_age_days, only_domain);
        if let Some(doc) = document {
            rules.default_max_age_days = doc.max_age_days;
            for rule in doc.domain_specific {
                rules
                    .domain_overrides
                    .insert(normalize_domain(&rule.domain), rule.max_age_days);
            }
        }
        rules
    }

    pub fn with_override(mut self, domain: &str, max_age_days: i64) -> Self {
        self.domain_overrides
            .insert(normalize_domain(domain), max_age_days);
        self
    }

    pub fn default_max_age_days(&self) -> i64 {
        self.default_max_age_days
    }

    pub fn only_domain(&self) -> Option<&str> {
        self.only_domain.as_deref()
    }

    pub fn overrides(&self) -> &HashMap<String, i64> {
        &self.domain_overrides
    }

    /// Maximum age allowed for bookmarks from `domain`. Domains excluded by
    /// `only_domain` get [`TimeDelta::MAX`] and are never archived.
    pub fn max_age(&self, domain: &str) -> TimeDelta {
        if let Some(only) = &self.only_domain {
            if domain != only.as_str() {
                return TimeDelta::MAX;
            }
        }
        let days = self
            .domain_overrides
            .get(domain)
            .copied()
            .unwrap_or(self.default_max_age_days);
        TimeDelta::try_days(days).unwrap_or(if days < 0 { TimeDelta::MIN } else { TimeDelta::MAX })
    }
}

fn strip_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '#' => skip_line(&mut chars, &mut out),
            '/' if chars.peek() == Some(&'/') => skip_line(&mut chars, &mut out),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    // keep line numbers in parse errors meaningful
                    if inner == '\n' {
                        out.push('\n');
                    }
                    prev = inner;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String) {
    for c in chars.by_ref() {
        if c == '\n' {
            out.push('\n');
            break;
        }
    }
}

fn strip_trailing_commas(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
            out.push(c);
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if !matches!(next, Some(']') | Some('}')) {
                out.push(c);
            }
        } else {
            out.push(c);
        }
        i += 1;
    }
    out
}
