use crate::models::{CategoryFilter, Quote};
use crate::Result;

/// Ordered, in-memory list of quotes
///
/// Order only matters for display and export; duplicates are allowed.
/// Persistence is not this type's job - see [`crate::QuoteBook`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteCollection {
    quotes: Vec<Quote>,
}

impl QuoteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_quotes(quotes: Vec<Quote>) -> Self {
        Self { quotes }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn as_slice(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Quote> {
        self.quotes.iter()
    }

    /// Validate and append. On error nothing changes.
    pub fn add(&mut self, text: impl Into<String>, category: impl Into<String>) -> Result<&Quote> {
        let quote = Quote::new(text, category)?;
        self.quotes.push(quote);
        Ok(&self.quotes[self.quotes.len() - 1])
    }

    /// Quotes matching `filter`, in collection order.
    ///
    /// The iterator is `Clone`, so it can be walked more than once.
    pub fn filter_by_category<'a>(
        &'a self,
        filter: &'a CategoryFilter,
    ) -> impl Iterator<Item = &'a Quote> + Clone + 'a {
        self.quotes.iter().filter(move |q| filter.matches(q))
    }

    /// Swap out the whole collection in one go
    pub fn replace_all(&mut self, quotes: Vec<Quote>) {
        self.quotes = quotes;
    }

    /// Append everything in `imported`, duplicates included. Returns how many were added.
    pub fn merge_in<I>(&mut self, imported: I) -> usize
    where
        I: IntoIterator<Item = Quote>,
    {
        let before = self.quotes.len();
        self.quotes.extend(imported);
        self.quotes.len() - before
    }

    /// Order-sensitive structural equality with another snapshot
    pub fn same_as(&self, other: &[Quote]) -> bool {
        self.quotes.as_slice() == other
    }
}

impl<'a> IntoIterator for &'a QuoteCollection {
    type Item = &'a Quote;
    type IntoIter = std::slice::Iter<'a, Quote>;

    fn into_iter(self) -> Self::IntoIter {
        self.quotes.iter()
    }
}
