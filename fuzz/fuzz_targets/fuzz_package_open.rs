#![no_main]

use assetpack::{AssetPackage, DeserializerRegistry, HEADER_SIZE};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    if data.len() < HEADER_SIZE {
        return;
    }

    // Opening must fail cleanly, never panic
    let package = match AssetPackage::from_reader(
        Cursor::new(data.to_vec()),
        DeserializerRegistry::with_defaults(),
    ) {
        Ok(p) => p,
        Err(_) => return,
    };

    for id in package.enumerate("/", true) {
        let _ = package.get_metadata(id);
        let _ = package.load::<Vec<u8>>(id);
        let _ = package.load::<String>(id);
    }

    for tag in package.tags() {
        let _ = package.query_tags(tag);
    }

    let _ = package.has_folder("../..");
    let _ = package.close();
});
