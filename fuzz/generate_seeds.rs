//! Generate seed corpus for fuzzing

use assetpack::{ArchiveWriter, AssetMetadata, PackageMetadata};
use std::fs;

fn write_package(path: &str, assets: &[(i32, &str, &[u8])]) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = ArchiveWriter::create(path)?;
    writer.add_entry("package.json", &PackageMetadata::new("seed").to_json()?)?;

    let mut guid_table = String::new();
    let mut hierarchy = String::new();
    for (id, asset_path, data) in assets {
        guid_table.push_str(&format!("{}\n{}\n", id, asset_path));
        let folder = asset_path.rsplit_once('/').map_or("/", |(folder, _)| folder);
        hierarchy.push_str(&format!("{}\n1\n{}\n", folder, id));

        let mut metadata = AssetMetadata::new(*asset_path, "application/octet-stream");
        metadata.id = (*id).into();
        metadata.size = data.len() as u64;
        writer.add_entry(&format!("assets/{}", asset_path), data)?;
        writer.add_entry(&format!("metadata/{}.json", asset_path), &metadata.to_json()?)?;
    }

    let ids: Vec<String> = assets.iter().map(|(id, _, _)| id.to_string()).collect();
    let tag_table = format!("all\n{}\n{}", ids.len(), ids.join("\n"));

    writer.add_entry("guid_table.txt", guid_table.as_bytes())?;
    writer.add_entry("hierarchy.txt", hierarchy.as_bytes())?;
    writer.add_entry("tag_table.txt", tag_table.as_bytes())?;
    writer.finish()?;
    println!("Generated: {}", path);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let corpus_dir = "fuzz/corpus/fuzz_package_open";
    fs::create_dir_all(corpus_dir)?;

    write_package(&format!("{}/seed_empty.wpk", corpus_dir), &[])?;
    write_package(
        &format!("{}/seed_single.wpk", corpus_dir),
        &[(1, "readme.txt", b"Hello, World!".as_slice())],
    )?;
    let shader = vec![b'x'; 8192];
    write_package(
        &format!("{}/seed_nested.wpk", corpus_dir),
        &[
            (1, "foo/bar.png", b"\x89PNG".as_slice()),
            (2, "foo/baz/qux.json", br#"{ "a": 1 }"#.as_slice()),
            (3, "shaders/lit.frag", shader.as_slice()),
        ],
    )?;

    Ok(())
}
