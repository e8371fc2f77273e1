//! Control-plane command lines
//!
//! A command is kept as a list of discrete tokens from construction to
//! execution. Values containing spaces (role names, tag values) are never
//! joined into a shell string, so no quoting is involved.

use crate::tags::Tags;
use std::fmt;

const MASK: &str = "*****";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Token {
    value: String,
    secret: bool,
}

/// A control-plane command such as `webapp show --name demo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    tokens: Vec<Token>,
}

impl CommandLine {
    /// Start a command in the given namespace (`group`, `webapp`, `ad app`...)
    pub fn new(namespace: &str) -> Self {
        let tokens = namespace
            .split_whitespace()
            .map(|part| Token {
                value: part.to_string(),
                secret: false,
            })
            .collect();
        Self { tokens }
    }

    /// Append positional tokens, split on whitespace (`"plan create"`)
    pub fn action(mut self, action: &str) -> Self {
        for part in action.split_whitespace() {
            self = self.arg(part);
        }
        self
    }

    /// Append a single token verbatim
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.tokens.push(Token {
            value: value.into(),
            secret: false,
        });
        self
    }

    /// Append `name value` as two tokens
    pub fn flag(self, name: &str, value: impl Into<String>) -> Self {
        self.arg(name).arg(value)
    }

    /// Append `name value`; the value is masked when the command is displayed
    pub fn secret_flag(mut self, name: &str, value: impl Into<String>) -> Self {
        self = self.arg(name);
        self.tokens.push(Token {
            value: value.into(),
            secret: true,
        });
        self
    }

    /// Append `--tags` followed by one `key=value` token per tag
    pub fn tags(mut self, tags: &Tags) -> Self {
        if tags.is_empty() {
            return self;
        }
        self = self.arg("--tags");
        for token in tags.to_tokens() {
            self = self.arg(token);
        }
        self
    }

    /// Append `--name key=value...` with one token per entry
    pub fn pairs<I, K, V>(mut self, name: &str, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: fmt::Display,
        V: fmt::Display,
    {
        self = self.arg(name);
        for (key, value) in pairs {
            self = self.arg(format!("{}={}", key, value));
        }
        self
    }

    /// Tokens as handed to the process
    pub fn args(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.value.as_str()).collect()
    }

    /// True when the command starts with the given tokens
    pub fn starts_with(&self, prefix: &str) -> bool {
        let mut tokens = self.tokens.iter();
        prefix
            .split_whitespace()
            .all(|part| tokens.next().is_some_and(|t| t.value == part))
    }

    /// Value following `name`, if the flag is present
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.tokens
            .windows(2)
            .find(|pair| pair[0].value == name)
            .map(|pair| pair[1].value.as_str())
    }

    /// Tokens following `name` up to the next `--flag`
    pub fn values_of(&self, name: &str) -> Vec<&str> {
        self.tokens
            .iter()
            .skip_while(|t| t.value != name)
            .skip(1)
            .take_while(|t| !t.value.starts_with("--"))
            .map(|t| t.value.as_str())
            .collect()
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.tokens.iter().any(|t| t.value == name)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<&str> = self
            .tokens
            .iter()
            .map(|t| if t.secret { MASK } else { t.value.as_str() })
            .collect();
        write!(f, "{}", rendered.join(" "))
    }
}
