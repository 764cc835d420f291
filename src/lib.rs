use std::error::Error;

pub mod archive;
pub mod config;
pub mod error;
pub mod instapaper;
pub mod model;
pub mod oauth;
pub mod rules;
pub mod source;

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RulesError;

    #[test]
    fn unpack_error_joins_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = RulesError::Io {
            path: "rules.json".to_string(),
            source: io,
        };
        assert_eq!(
            unpack_error(&err),
            "failed to read rules file rules.json: gone"
        );
    }
}
