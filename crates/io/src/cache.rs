use std::collections::HashMap;

use concilia_recon::{ReconError, Table};
use tracing::debug;

use crate::ingest::read_table;

/// Parsed tables memoized by BLAKE3 content hash plus skip count.
///
/// Entries live until invalidated; nothing expires on its own.
#[derive(Debug, Default)]
pub struct ParseCache {
    entries: HashMap<(blake3::Hash, usize), Table>,
    hits: u64,
    misses: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_parse(
        &mut self,
        name: &str,
        bytes: &[u8],
        skip_rows: usize,
    ) -> Result<Table, ReconError> {
        let key = (blake3::hash(bytes), skip_rows);
        if let Some(table) = self.entries.get(&key) {
            self.hits += 1;
            debug!(file = name, hash = %key.0.to_hex(), "parse cache hit");
            return Ok(table.clone());
        }

        self.misses += 1;
        let table = read_table(name, bytes, skip_rows)?;
        self.entries.insert(key, table.clone());
        Ok(table)
    }

    /// Drop every entry parsed from `bytes`, whatever its skip count.
    /// Returns the number of entries removed.
    pub fn invalidate(&mut self, bytes: &[u8]) -> usize {
        let hash = blake3::hash(bytes);
        let before = self.entries.len();
        self.entries.retain(|(h, _), _| *h != hash);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICES: &[u8] = b"sku,cost\nA,3\n";

    #[test]
    fn second_parse_is_a_hit() {
        let mut cache = ParseCache::new();
        let a = cache.get_or_parse("precos.csv", PRICES, 0).unwrap();
        let b = cache.get_or_parse("precos-copy.csv", PRICES, 0).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, entries: 1 });
    }

    #[test]
    fn skip_count_is_part_of_the_key() {
        let mut cache = ParseCache::new();
        cache.get_or_parse("p.csv", b"title\nsku,cost\nA,3\n", 0).unwrap();
        cache.get_or_parse("p.csv", b"title\nsku,cost\nA,3\n", 1).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn invalidate_removes_all_variants() {
        let mut cache = ParseCache::new();
        cache.get_or_parse("p.csv", PRICES, 0).unwrap();
        cache.get_or_parse("p.csv", PRICES, 1).unwrap();
        cache.get_or_parse("o.csv", b"order_id\n1\n", 0).unwrap();

        assert_eq!(cache.invalidate(PRICES), 2);
        assert_eq!(cache.len(), 1);

        cache.get_or_parse("p.csv", PRICES, 0).unwrap();
        assert_eq!(cache.stats().misses, 4);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn parse_errors_are_not_cached() {
        let mut cache = ParseCache::new();
        assert!(cache.get_or_parse("o.csv", b"", 0).is_err());
        assert!(cache.is_empty());
    }
}
