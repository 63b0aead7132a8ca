//! Recovery policy for agent output that could not be parsed.

use std::fmt;
use std::sync::Arc;

use crate::agent::AgentError;

type TransformFn = dyn Fn(&AgentError) -> String + Send + Sync;

/// Turns a parse failure into an observation so the loop can continue.
#[derive(Clone)]
pub enum ParserErrorHandler {
    /// `prefix + (text, or the error's message) + suffix`
    StaticText {
        text: Option<String>,
        prefix: String,
        suffix: String,
    },
    /// Caller-supplied formatting of the error.
    Transform(Arc<TransformFn>),
}

impl ParserErrorHandler {
    /// Observe the parse error's own message.
    pub fn default_text() -> Self {
        ParserErrorHandler::StaticText {
            text: None,
            prefix: String::new(),
            suffix: String::new(),
        }
    }

    /// Observe a fixed message.
    pub fn text(text: impl Into<String>) -> Self {
        ParserErrorHandler::StaticText {
            text: Some(text.into()),
            prefix: String::new(),
            suffix: String::new(),
        }
    }

    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(&AgentError) -> String + Send + Sync + 'static,
    {
        ParserErrorHandler::Transform(Arc::new(f))
    }

    /// Set the prefix. No effect on `Transform`.
    pub fn with_prefix(mut self, value: impl Into<String>) -> Self {
        if let ParserErrorHandler::StaticText { prefix, .. } = &mut self {
            *prefix = value.into();
        }
        self
    }

    /// Set the suffix. No effect on `Transform`.
    pub fn with_suffix(mut self, value: impl Into<String>) -> Self {
        if let ParserErrorHandler::StaticText { suffix, .. } = &mut self {
            *suffix = value.into();
        }
        self
    }

    /// Observation text for `err`.
    pub fn observation(&self, err: &AgentError) -> String {
        match self {
            ParserErrorHandler::StaticText {
                text,
                prefix,
                suffix,
            } => {
                let body = match text {
                    Some(text) => text.clone(),
                    None => err.to_string(),
                };
                format!("{}{}{}", prefix, body, suffix)
            }
            ParserErrorHandler::Transform(f) => f(err),
        }
    }
}

impl Default for ParserErrorHandler {
    fn default() -> Self {
        Self::default_text()
    }
}

impl fmt::Debug for ParserErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserErrorHandler::StaticText {
                text,
                prefix,
                suffix,
            } => f
                .debug_struct("StaticText")
                .field("text", text)
                .field("prefix", prefix)
                .field("suffix", suffix)
                .finish(),
            ParserErrorHandler::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_text_is_the_error_message() {
        let err = AgentError::unparsable("gibberish");
        assert_eq!(
            ParserErrorHandler::default_text().observation(&err),
            "unable to parse agent output"
        );
    }

    #[test]
    fn static_text_with_affixes() {
        let handler = ParserErrorHandler::text("Invalid format.")
            .with_prefix("Error: ")
            .with_suffix(" Use Action/Action Input.");
        assert_eq!(
            handler.observation(&AgentError::unparsable("x")),
            "Error: Invalid format. Use Action/Action Input."
        );
    }

    #[test]
    fn transform_sees_the_raw_output() {
        let handler = ParserErrorHandler::transform(|err| {
            format!("Could not parse: {}", err.raw_output().unwrap_or_default())
        })
        .with_prefix("ignored");
        assert_eq!(
            handler.observation(&AgentError::unparsable("hmm")),
            "Could not parse: hmm"
        );
    }
}
