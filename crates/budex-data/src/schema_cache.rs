//! Primary-key cache

use parking_lot::RwLock;
use std::collections::HashMap;

/// Primary keys already looked up, per connection string and table.
///
/// Adapters filling with `AddWithKey` consult this before asking the engine.
/// A cached empty key means the table has none.
#[derive(Debug, Default)]
pub struct SchemaCache {
    keys: RwLock<HashMap<(String, String), Vec<String>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached key columns of `table`
    pub fn primary_key(&self, connection_string: &str, table: &str) -> Option<Vec<String>> {
        let result = self
            .keys
            .read()
            .get(&(connection_string.to_string(), table.to_ascii_lowercase()))
            .cloned();
        if result.is_some() {
            tracing::debug!(table = %table, "cache hit for primary key");
        } else {
            tracing::debug!(table = %table, "cache miss for primary key");
        }
        result
    }

    pub fn set_primary_key(&self, connection_string: &str, table: &str, columns: Vec<String>) {
        self.keys.write().insert(
            (connection_string.to_string(), table.to_ascii_lowercase()),
            columns,
        );
    }

    /// Forget everything cached for one connection string
    pub fn invalidate(&self, connection_string: &str) {
        self.keys
            .write()
            .retain(|(cs, _), _| cs.as_str() != connection_string);
    }

    pub fn clear(&self) {
        self.keys.write().clear();
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_is_keyed_by_connection_and_table() {
        let cache = SchemaCache::new();
        assert!(cache.primary_key("a", "Accounts").is_none());

        cache.set_primary_key("a", "Accounts", vec!["Code".into()]);
        cache.set_primary_key("b", "Accounts", vec![]);
        assert_eq!(
            cache.primary_key("a", "accounts"),
            Some(vec!["Code".to_string()])
        );
        assert_eq!(cache.primary_key("b", "Accounts"), Some(vec![]));

        cache.invalidate("a");
        assert!(cache.primary_key("a", "Accounts").is_none());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
