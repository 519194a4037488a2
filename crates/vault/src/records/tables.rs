//! [`IvTables`]: which tables have `_iv` sibling columns.

use std::{collections::HashSet, sync::Arc};

use super::Category;

/// Allow-list of tables that can store an IV next to each sensitive column.
///
/// Writes to any other table fall back to marked plaintext.
#[derive(Debug, Clone)]
pub struct IvTables {
    inner: Arc<HashSet<String>>,
}

impl IvTables {
    /// Build the allow-list from table names.
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(tables.into_iter().map(Into::into).collect()),
        }
    }

    /// Parse a comma-separated list, ignoring blanks.
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty()),
        )
    }

    /// Returns `true` if `table` has `_iv` columns.
    pub fn supports_iv(&self, table: &str) -> bool {
        self.inner.contains(table)
    }

    /// Number of tables in the allow-list.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if no table supports IVs.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for IvTables {
    /// Every category table.
    fn default() -> Self {
        Self::new(Category::ALL.iter().map(|c| c.table()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_covers_every_category() {
        let tables = IvTables::default();
        assert_eq!(tables.len(), 5);
        for category in Category::ALL {
            assert!(tables.supports_iv(category.table()));
        }
    }

    #[test]
    fn parse_trims_and_skips_blanks() {
        let tables = IvTables::parse(" insulindata, ,fooddata ,");
        assert_eq!(tables.len(), 2);
        assert!(tables.supports_iv("fooddata"));
        assert!(!tables.supports_iv("mooddata"));
    }

    #[test]
    fn empty_list() {
        assert!(IvTables::parse("").is_empty());
    }
}
