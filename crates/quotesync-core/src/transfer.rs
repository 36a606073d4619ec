use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

use crate::{models::Quote, Error, Result};

/// How picky an import is about individual elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStrictness {
    /// Any malformed element rejects the whole file
    #[default]
    Strict,
    /// Malformed elements are skipped and logged
    Lax,
}

/// Result of parsing an import document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportBatch {
    pub quotes: Vec<Quote>,
    pub skipped: usize,
}

/// JSON import/export of quote collections
///
/// The document format is a plain array of `{text, category}` objects,
/// so an export can always be fed straight back into an import.
pub struct ImportExport;

impl ImportExport {
    /// Pretty-printed JSON array, order preserved
    pub fn to_json(quotes: &[Quote]) -> Result<String> {
        Ok(serde_json::to_string_pretty(quotes)?)
    }

    pub fn export_to_file<P: AsRef<Path>>(quotes: &[Quote], path: P) -> Result<()> {
        let json = Self::to_json(quotes)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Parse an import document without touching any collection
    pub fn parse(document: &str, strictness: ImportStrictness) -> Result<ImportBatch> {
        let value: Value = serde_json::from_str(document)
            .map_err(|e| Error::Format(format!("not valid JSON ({})", e)))?;

        let Value::Array(elements) = value else {
            return Err(Error::Format(
                "expected a JSON array of quotes at the top level".to_string(),
            ));
        };

        let mut batch = ImportBatch::default();
        for (index, element) in elements.into_iter().enumerate() {
            match serde_json::from_value::<Quote>(element) {
                Ok(quote) => batch.quotes.push(quote),
                Err(e) => match strictness {
                    ImportStrictness::Strict => {
                        return Err(Error::Validation(format!(
                            "element {} is not a quote: {}",
                            index + 1,
                            e
                        )));
                    }
                    ImportStrictness::Lax => {
                        warn!("Skipping import element {}: {}", index + 1, e);
                        batch.skipped += 1;
                    }
                },
            }
        }

        Ok(batch)
    }

    pub fn read_file<P: AsRef<Path>>(path: P, strictness: ImportStrictness) -> Result<ImportBatch> {
        let document = std::fs::read_to_string(path)?;
        Self::parse(&document, strictness)
    }
}
