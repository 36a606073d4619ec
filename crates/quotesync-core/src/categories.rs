// Distinct categories, derived fresh from the collection every time
use std::collections::HashSet;

use crate::models::Quote;

/// Distinct categories in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryIndex {
    categories: Vec<String>,
}

impl CategoryIndex {
    pub fn build<'a, I>(quotes: I) -> Self
    where
        I: IntoIterator<Item = &'a Quote>,
    {
        let mut seen = HashSet::new();
        let categories = quotes
            .into_iter()
            .filter(|q| seen.insert(q.category()))
            .map(|q| q.category().to_string())
            .collect();

        Self { categories }
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.categories
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.categories.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::seed_quotes;

    #[test]
    fn test_first_seen_order() {
        let index = CategoryIndex::build(&seed_quotes());
        assert_eq!(index.as_slice(), &["Motivation".to_string(), "Life".to_string()]);
    }

    #[test]
    fn test_empty_collection() {
        let index = CategoryIndex::build(&Vec::<Quote>::new());
        assert!(index.is_empty());
    }

    #[test]
    fn test_categories_are_case_sensitive() {
        let quotes = vec![
            Quote::new("a", "Life").unwrap(),
            Quote::new("b", "life").unwrap(),
            Quote::new("c", "Life").unwrap(),
        ];
        let index = CategoryIndex::build(&quotes);
        assert_eq!(index.len(), 2);
        assert!(index.contains("life"));
        assert!(!index.contains("LIFE"));
    }
}
