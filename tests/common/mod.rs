//! Shared fixtures for the integration tests: package archives, settings
//! documents and a throwaway workspace.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use scorm_processor::{Orchestrator, ProcessorConfig};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const MANIFEST_12: &str = r#"<?xml version="1.0"?><manifest identifier="course" version="1.2"/>"#;
pub const MANIFEST_2004: &str =
    r#"<?xml version="1.0"?><manifest identifier="course" version="2004 4th Edition"/>"#;
pub const INDEX_HTML: &str = "<html><body>Welcome</body></html>";
pub const SCORM_2004_JS: &str = "function finish() { LMSCommit(); }\n";

/// An `adminsettings.xml` with every version flag set the "wrong" way round
/// for a 1.2 conversion, plus the given extra elements
pub fn settings_xml(extra: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<AdminSettings>
  <UseScorm>false</UseScorm>
  <UseScormVersion12>false</UseScormVersion12>
  <UseScormVersion2004>true</UseScormVersion2004>
  <URLOnExit>exit.html</URLOnExit>
  <ReviewMode>true</ReviewMode>
  <HostedOniLMS>true</HostedOniLMS>
  {}
</AdminSettings>
"#,
        extra
    )
}

/// Legacy-engine package: marker directory, license data file, both
/// descriptors and some clutter for the cleaner
pub fn variant_a_package() -> Vec<(String, Vec<u8>)> {
    files([
        ("imsmanifest.xml", MANIFEST_12.to_string()),
        ("imsmanifest_SCORM2004.xml", MANIFEST_2004.to_string()),
        ("index.html", INDEX_HTML.to_string()),
        ("scorm/api.js", "var api = null;".to_string()),
        ("js/data.xml", "<data>trial</data>".to_string()),
        ("js/scorm_2004.js", SCORM_2004_JS.to_string()),
        ("adminsettings.xml", settings_xml("<toplogo>default.png</toplogo>")),
        ("readme.md", "# notes".to_string()),
        (".idea/workspace.xml", "<project/>".to_string()),
    ])
}

/// Current-engine package with its settings under `xmls/`
pub fn variant_b_package() -> Vec<(String, Vec<u8>)> {
    files([
        ("imsmanifest.xml", MANIFEST_12.to_string()),
        ("imsmanifest_SCORM2004.xml", MANIFEST_2004.to_string()),
        ("index.html", INDEX_HTML.to_string()),
        ("js/scorm_2004.js", SCORM_2004_JS.to_string()),
        (
            "xmls/adminsettings.xml",
            settings_xml("<TopLogo/>\n  <CustomerLogo>old.png</CustomerLogo>"),
        ),
        ("aicc.au", "aicc".to_string()),
    ])
}

fn files<const N: usize>(entries: [(&str, String); N]) -> Vec<(String, Vec<u8>)> {
    entries
        .into_iter()
        .map(|(path, contents)| (path.to_string(), contents.into_bytes()))
        .collect()
}

/// Every file of a zip archive, keyed by entry name
pub fn read_zip(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut files = BTreeMap::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).unwrap();
        if entry.is_dir() {
            continue;
        }
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        files.insert(entry.name().to_string(), contents);
    }
    files
}

/// PNG of the given size
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 30, 30, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Temporary root holding the upload and processed directories
pub struct TestWorkspace {
    _temp: TempDir,
    pub root: Utf8PathBuf,
    pub config: ProcessorConfig,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let config = ProcessorConfig {
            upload_dir: root.join("uploads"),
            processed_dir: root.join("processed"),
            customer_script_path: root.join("special_files/scorm_2004.js"),
            ..ProcessorConfig::default()
        };
        fs::create_dir_all(&config.upload_dir).unwrap();
        Self {
            _temp: temp,
            root,
            config,
        }
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(Arc::new(self.config.clone()))
    }

    /// Write a zip archive into the upload directory
    pub fn upload(&self, name: &str, files: &[(String, Vec<u8>)]) -> Utf8PathBuf {
        let path = self.config.upload_dir.join(name);
        write_zip(&path, files);
        path
    }

    pub fn processed(&self, name: &str) -> Utf8PathBuf {
        self.config.processed_dir.join(name)
    }

    /// Names of every entry left in the processed directory
    pub fn processed_entries(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.config.processed_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn write_zip(path: &Utf8Path, files: &[(String, Vec<u8>)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut writer = ZipWriter::new(fs::File::create(path).unwrap());
    for (name, contents) in files {
        writer
            .start_file(name.as_str(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap();
}
