use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A single quote. Two quotes with the same text and category are the same quote.
///
/// Both fields are guaranteed non-empty after trimming, whether the quote
/// was typed in, imported, loaded from disk or fetched from the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawQuote")]
pub struct Quote {
    text: String,
    category: String,
}

/// Wire shape before validation
#[derive(Deserialize)]
struct RawQuote {
    text: String,
    category: String,
}

impl TryFrom<RawQuote> for Quote {
    type Error = Error;

    fn try_from(raw: RawQuote) -> Result<Self> {
        Quote::new(raw.text, raw.category)
    }
}

impl Quote {
    /// Build a quote, trimming both fields. `all` (any case) is reserved for
    /// the filter and can't be used as a category.
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Result<Self> {
        let text = text.into().trim().to_string();
        let category = category.into().trim().to_string();

        if text.is_empty() || category.is_empty() {
            return Err(Error::Validation(
                "Please enter both quote text and category.".to_string(),
            ));
        }
        if CategoryFilter::is_sentinel(&category) {
            return Err(Error::Validation(format!(
                "\"{}\" is reserved, please choose another category.",
                category
            )));
        }

        Ok(Self { text, category })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({})", self.text, self.category)
    }
}

/// The starter set used when nothing usable is stored
pub fn seed_quotes() -> Vec<Quote> {
    [
        (
            "The best way to get started is to quit talking and begin doing.",
            "Motivation",
        ),
        (
            "Life is what happens when you're busy making other plans.",
            "Life",
        ),
        ("Get busy living or get busy dying.", "Life"),
        (
            "Success is not final, failure is not fatal: It is the courage to continue that counts.",
            "Motivation",
        ),
    ]
    .into_iter()
    .map(|(text, category)| Quote {
        text: text.to_string(),
        category: category.to_string(),
    })
    .collect()
}

/// Which quotes the user wants to see
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    /// Stored form of [`CategoryFilter::All`]
    pub const ALL_SENTINEL: &'static str = "all";

    pub fn category(name: impl Into<String>) -> Self {
        CategoryFilter::Category(name.into())
    }

    fn is_sentinel(name: &str) -> bool {
        name.eq_ignore_ascii_case(Self::ALL_SENTINEL)
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(name) => quote.category() == name,
        }
    }

    pub fn as_stored(&self) -> &str {
        match self {
            CategoryFilter::All => Self::ALL_SENTINEL,
            CategoryFilter::Category(name) => name,
        }
    }

    /// Fall back to `All` when the remembered category no longer has any quotes
    pub fn resolve<S: AsRef<str>>(self, known_categories: &[S]) -> Self {
        match &self {
            CategoryFilter::All => self,
            CategoryFilter::Category(name) => {
                if known_categories.iter().any(|c| c.as_ref() == name) {
                    self
                } else {
                    CategoryFilter::All
                }
            }
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || Self::is_sentinel(s) {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Category(s.to_string()))
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_stored())
    }
}

impl From<Option<String>> for CategoryFilter {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(name) => name.parse().unwrap_or_default(),
            None => CategoryFilter::All,
        }
    }
}
