use crate::error::Result;
use crate::id::AssetId;
use crate::index::lines::IndexLines;
use std::collections::HashMap;
use tracing::warn;

pub const TAG_TABLE_ENTRY: &str = "tag_table.txt";

/// Immutable tag → ordered asset ids table
#[derive(Debug, Default)]
pub struct TagTable {
    tags: HashMap<String, Vec<AssetId>>,
}

impl TagTable {
    /// Parse blocks of `<tag>`, `<count>`, then `count` asset id lines
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = IndexLines::new(TAG_TABLE_ENTRY, text);
        let mut tags: HashMap<String, Vec<AssetId>> = HashMap::new();

        while let Some(tag) = lines.next_block() {
            let count = lines.expect_count()?;
            let mut assets = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                assets.push(AssetId::new(lines.expect_int("an asset id")?));
            }

            match tags.get_mut(tag) {
                Some(existing) => {
                    warn!(tag, "tag listed more than once, merging its assets");
                    existing.extend(assets);
                }
                None => {
                    tags.insert(tag.to_string(), assets);
                }
            }
        }

        Ok(Self { tags })
    }

    /// Assets carrying a tag; empty for unknown tags
    pub fn query(&self, tag: &str) -> &[AssetId] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PackageError;

    #[test]
    fn test_query() {
        let table = TagTable::parse("image\n2\n1\n2\nsound\n0\n").unwrap();
        assert_eq!(table.query("image"), &[AssetId::new(1), AssetId::new(2)]);
        assert!(table.query("sound").is_empty());
        assert!(table.query("missing").is_empty());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_tags_may_contain_spaces() {
        let table = TagTable::parse("ui icons\n1\n9").unwrap();
        assert_eq!(table.query("ui icons"), &[AssetId::new(9)]);
    }

    #[test]
    fn test_repeated_tag_appends() {
        let table = TagTable::parse("a\n1\n1\na\n1\n2").unwrap();
        assert_eq!(table.query("a"), &[AssetId::new(1), AssetId::new(2)]);
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            TagTable::parse("image\n2\n1"),
            Err(PackageError::IndexParse { .. })
        ));
        assert!(matches!(
            TagTable::parse("image\n1\none"),
            Err(PackageError::IndexParse { line: 3, .. })
        ));
    }
}
