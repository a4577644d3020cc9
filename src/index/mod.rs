//! Index tables built once when a package is opened
//!
//! Each table comes from one well-known text entry in the archive:
//!
//! ```text
//! guid_table.txt   <id>\n<path>\n ...
//! hierarchy.txt    <folder>\n<count>\n<id>\n ... (count ids) ...
//! tag_table.txt    <tag>\n<count>\n<id>\n ... (count ids) ...
//! ```
//!
//! Tables are immutable after parsing, so queries against them need no
//! locking.

mod guid_table;
mod hierarchy;
mod lines;
mod tag_table;

pub use guid_table::{GuidTable, GUID_TABLE_ENTRY};
pub use hierarchy::{AssetFolder, FolderTree, HIERARCHY_ENTRY};
pub use tag_table::{TagTable, TAG_TABLE_ENTRY};
