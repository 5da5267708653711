use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

pub fn zip_with_entries(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn zip_bytes(manifest: &str) -> Vec<u8> {
    zip_with_entries(&[("manifest.json", manifest), ("background.js", "// noop")])
}

pub fn crx3_bytes(manifest: &str) -> Vec<u8> {
    let header = [0xAAu8; 17];
    let mut data = b"Cr24".to_vec();
    data.extend_from_slice(&3u32.to_le_bytes());
    data.extend_from_slice(&(header.len() as u32).to_le_bytes());
    data.extend_from_slice(&header);
    data.extend_from_slice(&zip_bytes(manifest));
    data
}

pub fn crx2_bytes(manifest: &str) -> Vec<u8> {
    let key = [0x01u8; 9];
    let sig = [0x02u8; 5];
    let mut data = b"Cr24".to_vec();
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&(key.len() as u32).to_le_bytes());
    data.extend_from_slice(&(sig.len() as u32).to_le_bytes());
    data.extend_from_slice(&key);
    data.extend_from_slice(&sig);
    data.extend_from_slice(&zip_bytes(manifest));
    data
}

pub fn manifest_json(name: &str, version: &str) -> String {
    format!(r#"{{"name": "{name}", "version": "{version}", "manifest_version": 2}}"#)
}
