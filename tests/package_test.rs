//! Package open, index queries and asset lookup against on-disk packages

use assetpack::{
    ArchiveWriter, AssetId, AssetMetadata, AssetPackage, DeserializerRegistry, PackageError,
    PackageMetadata,
};
use std::io::Read;
use tempfile::NamedTempFile;

/// Helper: Index tables plus the assets they reference
struct Layout<'a> {
    guid_table: &'a str,
    hierarchy: &'a str,
    tag_table: &'a str,
    assets: &'a [(i32, &'a str, &'a [u8])],
}

const FOO_LAYOUT: Layout<'static> = Layout {
    guid_table: "1\nfoo/bar.png\n2\nfoo/baz.png",
    hierarchy: "foo\n2\n1\n2",
    tag_table: "image\n2\n1\n2",
    assets: &[
        (1, "foo/bar.png", b"\x89PNG bar".as_slice()),
        (2, "foo/baz.png", b"\x89PNG baz".as_slice()),
    ],
};

/// Helper: Write a package file, leaving out the named entries
fn write_package(layout: &Layout, skip: &[&str]) -> NamedTempFile {
    let temp_file = NamedTempFile::new().unwrap();
    let mut writer = ArchiveWriter::create(temp_file.path()).unwrap();

    let mut add = |path: &str, data: &[u8]| {
        if !skip.iter().any(|s| *s == path) {
            writer.add_entry(path, data).unwrap();
        }
    };

    add("package.json", &PackageMetadata::new("base").to_json().unwrap());
    add("guid_table.txt", layout.guid_table.as_bytes());
    add("hierarchy.txt", layout.hierarchy.as_bytes());
    add("tag_table.txt", layout.tag_table.as_bytes());

    for (id, path, data) in layout.assets {
        let mut metadata = AssetMetadata::new(*path, "image/png");
        metadata.id = AssetId::new(*id);
        metadata.size = data.len() as u64;
        metadata.tags.push("image".to_string());

        add(&format!("assets/{}", path), *data);
        add(&format!("metadata/{}.json", path), &metadata.to_json().unwrap());
    }

    writer.finish().unwrap();
    temp_file
}

fn open(file: &NamedTempFile) -> assetpack::Result<AssetPackage> {
    AssetPackage::open_file(file.path(), DeserializerRegistry::with_defaults())
}

#[test]
fn test_enumerate_and_tags() {
    let file = write_package(&FOO_LAYOUT, &[]);
    let package = open(&file).unwrap();

    let ids = [AssetId::new(1), AssetId::new(2)];
    assert_eq!(package.enumerate("foo", false), ids);
    assert_eq!(package.enumerate("foo", true), ids);
    assert_eq!(package.enumerate("/", true), ids);
    assert!(package.enumerate("/", false).is_empty());
    assert!(package.enumerate("missing", true).is_empty());

    assert_eq!(package.query_tags("image"), ids);
    assert!(package.query_tags("audio").is_empty());
    assert_eq!(package.tags(), vec!["image"]);

    assert_eq!(package.get_path(AssetId::new(2)).unwrap(), "foo/baz.png");
    assert_eq!(package.all().len(), 2);
    assert_eq!(package.subfolders("/"), vec!["foo"]);
    let foo = package.folder("/foo/").unwrap();
    assert_eq!(foo.name(), "foo");
    assert_eq!(foo.assets(), ids.as_slice());
    assert!(package.folder("missing").is_none());
    assert!(package.folder("/").unwrap().assets().is_empty());
    assert_eq!(package.metadata().name, "base");
}

#[test]
fn test_nested_folders_preorder() {
    let layout = Layout {
        guid_table: "1\na/one.txt\n2\na/b/two.txt\n3\na/c/three.txt\n4\na/b/d/four.txt",
        hierarchy: "a/b/d\n1\n4\na\n1\n1\na/b\n1\n2\na/c/\n1\n3\n",
        tag_table: "",
        assets: &[
            (1, "a/one.txt", b"1".as_slice()),
            (2, "a/b/two.txt", b"2".as_slice()),
            (3, "a/c/three.txt", b"3".as_slice()),
            (4, "a/b/d/four.txt", b"4".as_slice()),
        ],
    };
    let file = write_package(&layout, &[]);
    let package = open(&file).unwrap();

    let ids: Vec<i32> = package.enumerate("a", true).iter().map(|id| id.raw()).collect();
    // Children in creation order: b (synthesized by a/b/d), then c
    assert_eq!(ids, vec![1, 2, 4, 3]);
    assert_eq!(package.enumerate("/a/b/", false), vec![AssetId::new(2)]);
    assert!(package.has_folder("a/b/d"));
    assert!(!package.has_folder("a/d"));
    assert!(package.tags().is_empty());
}

#[test]
fn test_asset_and_metadata() {
    let file = write_package(&FOO_LAYOUT, &[]);
    let package = open(&file).unwrap();

    let asset = package.get_asset(AssetId::new(1)).unwrap();
    assert_eq!(asset.metadata().path, "foo/bar.png");
    assert_eq!(asset.metadata().mime_type, "image/png");
    assert!(asset.metadata().has_tag("image"));

    // Each open is an independent stream
    let mut first = Vec::new();
    asset.open().unwrap().read_to_end(&mut first).unwrap();
    let second = asset.read_bytes().unwrap();
    assert_eq!(first, b"\x89PNG bar");
    assert_eq!(first, second);

    let metadata = package.get_metadata(AssetId::new(2)).unwrap();
    assert_eq!(metadata.size, 8);
}

#[test]
fn test_missing_required_entries() {
    for entry in ["package.json", "guid_table.txt", "hierarchy.txt", "tag_table.txt"] {
        let file = write_package(&FOO_LAYOUT, &[entry]);
        match open(&file) {
            Err(PackageError::MalformedPackage(message)) => assert!(message.contains(entry)),
            other => panic!("Expected MalformedPackage for {}, got: {:?}", entry, other),
        }
    }
}

#[test]
fn test_missing_payload_vs_unknown_id() {
    let file = write_package(&FOO_LAYOUT, &["assets/foo/baz.png", "metadata/foo/bar.png.json"]);
    let package = open(&file).unwrap();

    assert!(matches!(
        package.get_asset(AssetId::new(2)),
        Err(PackageError::MalformedPackage(_))
    ));
    assert!(matches!(
        package.get_metadata(AssetId::new(1)),
        Err(PackageError::MalformedPackage(_))
    ));
    assert!(matches!(
        package.get_asset(AssetId::new(99)),
        Err(PackageError::NotFound(_))
    ));
    assert!(matches!(
        package.get_path(AssetId::new(99)),
        Err(PackageError::NotFound(_))
    ));
}

#[test]
fn test_none_id_is_invalid() {
    let file = write_package(&FOO_LAYOUT, &[]);
    let package = open(&file).unwrap();

    assert!(matches!(
        package.get_path(AssetId::NONE),
        Err(PackageError::InvalidArgument(_))
    ));
    assert!(matches!(
        package.get_asset(AssetId::NONE),
        Err(PackageError::InvalidArgument(_))
    ));
    assert!(matches!(
        package.get_metadata(AssetId::NONE),
        Err(PackageError::InvalidArgument(_))
    ));
    assert!(matches!(
        package.load::<Vec<u8>>(AssetId::NONE),
        Err(PackageError::InvalidArgument(_))
    ));
    assert!(!package.has_asset(AssetId::NONE));
}

#[test]
fn test_index_parse_errors() {
    let bad_count = Layout {
        hierarchy: "foo\n5\n1\n2",
        ..FOO_LAYOUT
    };
    let file = write_package(&bad_count, &[]);
    match open(&file) {
        Err(PackageError::IndexParse { entry, line, .. }) => {
            assert_eq!(entry, "hierarchy.txt");
            assert_eq!(line, 4);
        }
        other => panic!("Expected IndexParse, got: {:?}", other),
    }

    let bad_id = Layout {
        guid_table: "1\nfoo/bar.png\nbaz\nfoo/baz.png",
        ..FOO_LAYOUT
    };
    let file = write_package(&bad_id, &[]);
    match open(&file) {
        Err(PackageError::IndexParse { entry, line, .. }) => {
            assert_eq!(entry, "guid_table.txt");
            assert_eq!(line, 3);
        }
        other => panic!("Expected IndexParse, got: {:?}", other),
    }

    let bad_path = Layout {
        guid_table: "1\n/foo/bar.png",
        ..FOO_LAYOUT
    };
    let file = write_package(&bad_path, &[]);
    assert!(matches!(open(&file), Err(PackageError::InvalidPath { .. })));
}

#[test]
fn test_repeated_folder_block_appends() {
    let layout = Layout {
        hierarchy: "foo\n1\n1\nfoo\n1\n2",
        ..FOO_LAYOUT
    };
    let file = write_package(&layout, &[]);
    let package = open(&file).unwrap();
    assert_eq!(
        package.enumerate("foo", false),
        vec![AssetId::new(1), AssetId::new(2)]
    );
}

#[test]
fn test_close_is_idempotent() {
    let file = write_package(&FOO_LAYOUT, &[]);
    let package = open(&file).unwrap();

    let bytes = package.load::<Vec<u8>>(AssetId::new(1)).unwrap();
    assert!(package.is_cached(AssetId::new(1)));

    package.close().unwrap();
    package.close().unwrap();
    assert!(package.is_closed());
    assert!(!package.is_cached(AssetId::new(1)));

    // Objects handed out before close stay valid
    assert_eq!(bytes.as_slice(), b"\x89PNG bar");

    assert!(matches!(
        package.load::<Vec<u8>>(AssetId::new(1)),
        Err(PackageError::Disposed)
    ));
    assert!(matches!(
        package.get_asset(AssetId::new(2)),
        Err(PackageError::Disposed)
    ));

    // Index queries keep answering
    assert_eq!(package.enumerate("foo", false).len(), 2);
    assert_eq!(package.query_tags("image").len(), 2);
}

#[test]
fn test_from_reader() {
    let file = write_package(&FOO_LAYOUT, &[]);
    let data = std::fs::read(file.path()).unwrap();
    let package =
        AssetPackage::from_reader(std::io::Cursor::new(data), DeserializerRegistry::new()).unwrap();
    assert_eq!(package.id(), PackageMetadata::new("base").id);
    assert!(package.has_asset(AssetId::new(1)));
}

#[test]
fn test_path_derived_ids() {
    let bar = AssetId::from_path("foo/bar.png").raw();
    let baz = AssetId::from_path("foo/baz.png").raw();
    let guid_table = format!("{}\nfoo/bar.png\n{}\nfoo/baz.png", bar, baz);
    let hierarchy = format!("foo\n2\n{}\n{}", bar, baz);
    let assets = [
        (bar, "foo/bar.png", b"bar".as_slice()),
        (baz, "foo/baz.png", b"baz".as_slice()),
    ];
    let layout = Layout {
        guid_table: &guid_table,
        hierarchy: &hierarchy,
        tag_table: "",
        assets: &assets,
    };
    let file = write_package(&layout, &[]);
    let package = open(&file).unwrap();

    let by_path = package.load_path::<Vec<u8>>("/foo//baz.png").unwrap();
    let by_id = package.load::<Vec<u8>>(AssetId::new(baz)).unwrap();
    assert!(std::sync::Arc::ptr_eq(&by_path, &by_id));
    assert_eq!(by_path.as_slice(), b"baz");

    let encoded = AssetId::new(bar).to_string();
    assert_eq!(package.get_path(encoded.parse().unwrap()).unwrap(), "foo/bar.png");
}
