use std::str::FromStr;

use crate::error::DoraError;

/// API secret read once at startup. Never printed.
#[derive(Clone)]
pub struct Token(String);

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.trim().to_owned())
    }
}

impl FromStr for Token {
    type Err = DoraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = Self::from(s);
        if token.0.is_empty() {
            return Err(DoraError::Config("API token must not be empty".to_string()));
        }
        Ok(token)
    }
}

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<redacted>")
    }
}
