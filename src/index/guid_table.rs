use crate::error::{PackageError, Result};
use crate::id::AssetId;
use crate::index::lines::IndexLines;
use crate::path::validate_path;
use std::collections::HashMap;

pub const GUID_TABLE_ENTRY: &str = "guid_table.txt";

/// Immutable id → path table
#[derive(Debug, Default)]
pub struct GuidTable {
    paths: HashMap<AssetId, String>,
}

impl GuidTable {
    /// Parse alternating `<id>` / `<path>` lines
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = IndexLines::new(GUID_TABLE_ENTRY, text);
        let mut paths = HashMap::new();

        while let Some(id_line) = lines.next_block() {
            let id = id_line
                .trim()
                .parse::<i32>()
                .map(AssetId::new)
                .map_err(|_| lines.error(format!("id {:?} is not an integer", id_line)))?;

            let path = lines.expect_line("a path")?;
            validate_path(path)?;

            if paths.insert(id, path.to_string()).is_some() {
                return Err(PackageError::MalformedPackage(format!(
                    "{} lists asset {} twice",
                    GUID_TABLE_ENTRY, id
                )));
            }
        }

        Ok(Self { paths })
    }

    pub fn get(&self, id: AssetId) -> Option<&str> {
        self.paths.get(&id).map(String::as_str)
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.paths.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetId, &str)> {
        self.paths.iter().map(|(id, path)| (*id, path.as_str()))
    }
}
