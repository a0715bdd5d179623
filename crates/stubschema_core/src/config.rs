//! Validation configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default bound on annotation and expression nesting
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

/// Structured-comment dialect used for docstrings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocstringStyle {
    /// Try every dialect and keep the richest successful parse
    #[default]
    Auto,
    /// reStructuredText field lists (`:param x: ...`)
    Rest,
    /// Google style sections (`Args:`)
    Google,
    /// NumPy style underlined sections
    Numpy,
    /// Epydoc fields (`@param x:`)
    Epydoc,
}

impl DocstringStyle {
    /// Lowercase name of the style
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Rest => "rest",
            Self::Google => "google",
            Self::Numpy => "numpy",
            Self::Epydoc => "epydoc",
        }
    }
}

impl fmt::Display for DocstringStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocstringStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "rest" | "rst" | "restructuredtext" => Ok(Self::Rest),
            "google" => Ok(Self::Google),
            "numpy" | "numpydoc" => Ok(Self::Numpy),
            "epydoc" => Ok(Self::Epydoc),
            other => Err(format!("Unknown docstring style: {}", other)),
        }
    }
}

/// Configuration for one validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateConfig {
    /// Docstring dialect
    pub docstring_style: DocstringStyle,
    /// Maximum nesting of expressions and type annotations
    pub max_nesting_depth: usize,
}

impl ValidateConfig {
    /// Create a configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            docstring_style: DocstringStyle::Auto,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    /// Set the docstring dialect
    #[must_use]
    pub fn with_docstring_style(mut self, style: DocstringStyle) -> Self {
        self.docstring_style = style;
        self
    }

    /// Set the nesting bound
    #[must_use]
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Parse a configuration from JSON, filling absent fields with defaults
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a valid configuration object
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ValidateConfig::default();
        assert_eq!(config.docstring_style, DocstringStyle::Auto);
        assert_eq!(config.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_config_builder() {
        let config = ValidateConfig::new()
            .with_docstring_style(DocstringStyle::Google)
            .with_max_nesting_depth(8);
        assert_eq!(config.docstring_style, DocstringStyle::Google);
        assert_eq!(config.max_nesting_depth, 8);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = ValidateConfig::from_json(r#"{"docstring_style": "numpy"}"#).unwrap();
        assert_eq!(config.docstring_style, DocstringStyle::Numpy);
        assert_eq!(config.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_config_rejects_unknown_style() {
        assert!(ValidateConfig::from_json(r#"{"docstring_style": "javadoc"}"#).is_err());
    }

    #[test]
    fn test_style_from_str() {
        assert_eq!("Google".parse::<DocstringStyle>().unwrap(), DocstringStyle::Google);
        assert_eq!("rst".parse::<DocstringStyle>().unwrap(), DocstringStyle::Rest);
        assert_eq!("epydoc".parse::<DocstringStyle>().unwrap(), DocstringStyle::Epydoc);
        assert_eq!(DocstringStyle::Epydoc.to_string(), "epydoc");
        assert!("javadoc".parse::<DocstringStyle>().is_err());
    }
}
