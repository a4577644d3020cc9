use crate::error::Result;
use crate::id::AssetId;
use crate::index::lines::IndexLines;
use crate::path::normalize_path;
use std::collections::HashSet;
use tracing::warn;

pub const HIERARCHY_ENTRY: &str = "hierarchy.txt";

const ROOT: usize = 0;

/// A node of the folder tree
#[derive(Debug, Clone)]
pub struct AssetFolder {
    /// Folder name, not its path. The root is named `/`.
    name: String,
    children: Vec<usize>,
    assets: Vec<AssetId>,
}

impl AssetFolder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            assets: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assets directly contained in this folder
    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }
}

/// Folder hierarchy stored as an arena of nodes addressed by index
#[derive(Debug, Clone)]
pub struct FolderTree {
    folders: Vec<AssetFolder>,
}

impl Default for FolderTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderTree {
    /// Create a tree holding only the root folder
    pub fn new() -> Self {
        Self {
            folders: vec![AssetFolder::new("/")],
        }
    }

    /// Parse blocks of `<folder>`, `<count>`, then `count` asset id lines
    pub fn parse(text: &str) -> Result<Self> {
        let mut tree = Self::new();
        let mut lines = IndexLines::new(HIERARCHY_ENTRY, text);
        let mut listed = HashSet::new();

        while let Some(path) = lines.next_block() {
            let folder = tree.ensure(path);
            let count = lines.expect_count()?;

            let mut assets = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                assets.push(AssetId::new(lines.expect_int("an asset id")?));
            }

            if !listed.insert(folder) {
                warn!(folder = path, "folder listed more than once, merging its assets");
            }
            tree.folders[folder].assets.extend(assets);
        }

        Ok(tree)
    }

    /// Find or create the folder at `path`, creating missing ancestors
    pub fn ensure(&mut self, path: &str) -> usize {
        let normalized = normalize_path(path);
        let mut current = ROOT;

        for segment in normalized.split('/').filter(|s| !s.is_empty()) {
            current = match self.child(current, segment) {
                Some(child) => child,
                None => {
                    let created = self.folders.len();
                    self.folders.push(AssetFolder::new(segment));
                    self.folders[current].children.push(created);
                    created
                }
            };
        }

        current
    }

    /// Resolve a folder path to its node, walking from the root
    ///
    /// `""` and `"/"` resolve to the root.
    pub fn resolve(&self, path: &str) -> Option<usize> {
        normalize_path(path)
            .split('/')
            .filter(|s| !s.is_empty())
            .try_fold(ROOT, |current, segment| self.child(current, segment))
    }

    pub fn folder(&self, index: usize) -> Option<&AssetFolder> {
        self.folders.get(index)
    }

    /// Asset ids in a folder, optionally including every descendant folder
    ///
    /// Recursion is pre-order: a folder's own assets come before those of
    /// its children, children in the order they were created. An
    /// unresolvable path yields nothing.
    pub fn enumerate(&self, path: &str, recursive: bool) -> Vec<AssetId> {
        let mut out = Vec::new();
        if let Some(index) = self.resolve(path) {
            self.collect(index, recursive, &mut out);
        }
        out
    }

    /// Names of the direct child folders of a folder
    pub fn subfolders(&self, path: &str) -> Vec<&str> {
        match self.resolve(path) {
            Some(index) => self.folders[index]
                .children
                .iter()
                .map(|&child| self.folders[child].name.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of folders, including the root
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.len() == 1 && self.folders[ROOT].assets.is_empty()
    }

    /// Every asset id listed anywhere in the tree
    pub fn all_assets(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.folders.iter().flat_map(|f| f.assets.iter().copied())
    }

    fn child(&self, parent: usize, name: &str) -> Option<usize> {
        self.folders[parent]
            .children
            .iter()
            .copied()
            .find(|&child| self.folders[child].name == name)
    }

    fn collect(&self, index: usize, recursive: bool, out: &mut Vec<AssetId>) {
        let folder = &self.folders[index];
        out.extend_from_slice(&folder.assets);
        if recursive {
            for &child in &folder.children {
                self.collect(child, recursive, out);
            }
        }
    }
}
