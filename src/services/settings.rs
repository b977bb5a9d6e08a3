use crate::error::{PipelineError, ResourceContext};
use crate::models::{EngineVariant, TargetVersion};
use crate::progress::ProgressReporter;
use crate::services::config_document::ConfigDocument;
use crate::tree::PackageTree;
use indexmap::IndexMap;

/// File name of the engine configuration document
pub const CONFIG_DOCUMENT_NAME: &str = "adminsettings.xml";

/// Version flag tags and the literal values they receive, in write order
pub fn version_flags(target: TargetVersion) -> IndexMap<&'static str, &'static str> {
    let (scorm12, scorm2004) = match target {
        TargetVersion::Scorm12 => ("true", "false"),
        TargetVersion::Scorm2004 => ("false", "true"),
    };
    IndexMap::from([
        ("UseScorm", "true"),
        ("UseScormVersion12", scorm12),
        ("UseScormVersion2004", scorm2004),
        ("URLOnExit", ""),
        ("ReviewMode", "false"),
        ("HostedOniLMS", "false"),
    ])
}

/// What the settings editor writes into each configuration document
#[derive(Debug, Clone, Copy)]
pub struct SettingsEdit<'a> {
    pub target: TargetVersion,
    pub variant: EngineVariant,
    /// Path produced by the branding stage
    pub logo_path: Option<&'a str>,
    pub license_key: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsReport {
    /// Documents rewritten successfully
    pub updated: Vec<String>,
    /// Documents that could not be parsed or written
    pub failed: Vec<String>,
}

/// Settings stage: rewrite every `adminsettings.xml` in the package.
///
/// Each document is handled independently; a document that cannot be read,
/// parsed or written is reported as an error event and skipped. Finding no
/// document at all is fatal.
pub fn edit_settings(
    tree: &mut dyn PackageTree,
    edit: &SettingsEdit<'_>,
    progress: &mut ProgressReporter<'_>,
) -> Result<SettingsReport, PipelineError> {
    progress.step(format!(
        "Finding and editing '{}' files for SCORM {}",
        CONFIG_DOCUMENT_NAME, edit.target
    ));

    let mut paths: Vec<String> = tree
        .entries()
        .resource_context(|| "Could not list package contents")?
        .into_iter()
        .filter(|entry| !entry.is_dir && entry.name() == CONFIG_DOCUMENT_NAME)
        .map(|entry| entry.path)
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(PipelineError::validation(format!(
            "No '{}' files were found in the package.",
            CONFIG_DOCUMENT_NAME
        )));
    }

    let mut report = SettingsReport::default();
    for path in paths {
        progress.action(format!("Found '{}'. Applying changes...", path));
        match edit_document(tree, &path, edit, progress) {
            Ok(()) => report.updated.push(path),
            Err(e) => {
                progress.error(format!("Failed to edit {}: {}", path, e));
                report.failed.push(path);
            }
        }
    }

    progress.success(format!(
        "Processed {} '{}' file(s).",
        report.updated.len() + report.failed.len(),
        CONFIG_DOCUMENT_NAME
    ));
    Ok(report)
}

fn edit_document(
    tree: &mut dyn PackageTree,
    path: &str,
    edit: &SettingsEdit<'_>,
    progress: &mut ProgressReporter<'_>,
) -> Result<(), PipelineError> {
    let bytes = tree.read(path).resource_context(|| format!("Could not read {}", path))?;
    let mut document = ConfigDocument::parse(&bytes)?;

    for (tag, value) in version_flags(edit.target) {
        if document.set_text(tag, value).is_found() {
            tracing::debug!("Set <{}> to '{}' in {}", tag, value, path);
        } else {
            progress.warning(format!("Tag <{}> not found in {}.", tag, path));
        }
    }

    let layout = edit.variant.layout();

    if let Some(logo_path) = edit.logo_path {
        for tag in layout.logo_tags {
            if document.set_text(tag, logo_path).is_found() {
                progress.action(format!("Set <{}> to '{}'", tag, logo_path));
            } else {
                progress.warning(format!("Logo tag <{}> not found in {}.", tag, path));
            }
        }
    }

    if let (Some(key), Some(key_tag), Some(check_tag)) = (
        edit.license_key,
        layout.license_key_tag,
        layout.license_check_tag,
    ) {
        if document.set_or_create(key_tag, key) {
            progress.action(format!("Created missing <{}> tag.", key_tag));
        }
        progress.action(format!("Set <{}> with license key.", key_tag));

        if document.set_or_create(check_tag, "true") {
            progress.action(format!("Created missing <{}> tag.", check_tag));
        }
        progress.action(format!("Set <{}> to 'true'.", check_tag));
    }

    let rewritten = document.to_bytes()?;
    tree.write(path, &rewritten)
        .resource_context(|| format!("Could not write {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{EventKind, ProgressEvent};
    use crate::services::config_document::Lookup;
    use crate::tree::MemoryTree;

    const SETTINGS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<AdminSettings xmlns="http://www.w3.org/2001/XMLSchema">
  <UseScorm>false</UseScorm>
  <UseScormVersion12>false</UseScormVersion12>
  <UseScormVersion2004>true</UseScormVersion2004>
  <URLOnExit>exit.html</URLOnExit>
  <ReviewMode>true</ReviewMode>
  <HostedOniLMS>true</HostedOniLMS>
  <TopLogo/>
  <CustomerLogo>old.png</CustomerLogo>
</AdminSettings>
"#;

    fn run(
        tree: &mut MemoryTree,
        edit: SettingsEdit<'_>,
    ) -> (Result<SettingsReport, PipelineError>, Vec<ProgressEvent>) {
        let mut events = Vec::new();
        let mut progress = ProgressReporter::new(&mut events);
        let result = edit_settings(tree, &edit, &mut progress);
        drop(progress);
        (result, events)
    }

    fn document(tree: &MemoryTree, path: &str) -> ConfigDocument {
        ConfigDocument::parse(&tree.read(path).unwrap()).unwrap()
    }

    fn edit(target: TargetVersion, variant: EngineVariant) -> SettingsEdit<'static> {
        SettingsEdit {
            target,
            variant,
            logo_path: None,
            license_key: None,
        }
    }

    #[test]
    fn test_version_flag_tables() {
        let flags = version_flags(TargetVersion::Scorm12);
        assert_eq!(flags["UseScormVersion12"], "true");
        assert_eq!(flags["UseScormVersion2004"], "false");
        let flags = version_flags(TargetVersion::Scorm2004);
        assert_eq!(flags["UseScormVersion12"], "false");
        assert_eq!(flags["UseScormVersion2004"], "true");
        assert_eq!(flags.keys().next(), Some(&"UseScorm"));
        assert_eq!(flags["URLOnExit"], "");
    }

    #[test]
    fn test_rewrites_every_document() {
        let mut tree = MemoryTree::from_files([
            ("xmls/adminsettings.xml", SETTINGS),
            ("xmls/de/adminsettings.xml", SETTINGS),
        ])
        .unwrap();

        let (result, events) = run(&mut tree, edit(TargetVersion::Scorm12, EngineVariant::VariantA));
        let report = result.unwrap();

        assert_eq!(report.updated.len(), 2);
        for path in ["xmls/adminsettings.xml", "xmls/de/adminsettings.xml"] {
            let doc = document(&tree, path);
            assert_eq!(doc.text("UseScorm").as_deref(), Some("true"));
            assert_eq!(doc.text("UseScormVersion12").as_deref(), Some("true"));
            assert_eq!(doc.text("UseScormVersion2004").as_deref(), Some("false"));
            assert_eq!(doc.text("URLOnExit").as_deref(), Some(""));
            assert_eq!(doc.text("HostedOniLMS").as_deref(), Some("false"));
        }
        assert_eq!(
            events.last().unwrap().text,
            "Processed 2 'adminsettings.xml' file(s)."
        );
    }

    #[test]
    fn test_variant_b_logo_and_license() {
        let mut tree = MemoryTree::from_files([("xmls/adminsettings.xml", SETTINGS)]).unwrap();
        let settings = SettingsEdit {
            logo_path: Some("../brand.png"),
            license_key: Some("KEY-42"),
            ..edit(TargetVersion::Scorm2004, EngineVariant::VariantB)
        };

        let (result, events) = run(&mut tree, settings);
        result.unwrap();

        let doc = document(&tree, "xmls/adminsettings.xml");
        assert_eq!(doc.text("TopLogo").as_deref(), Some("../brand.png"));
        assert_eq!(doc.text("CustomerLogo").as_deref(), Some("../brand.png"));
        assert_eq!(doc.text("KeyCode").as_deref(), Some("KEY-42"));
        assert_eq!(doc.text("EnableCheck").as_deref(), Some("true"));
        assert_eq!(doc.lookup("KeyCode"), Lookup::Qualified);
        assert!(events.iter().any(|e| e.text == "Created missing <KeyCode> tag."));
        assert!(events.iter().all(|e| !e.text.contains("KEY-42")));
    }

    #[test]
    fn test_variant_a_ignores_license_tags() {
        let mut tree = MemoryTree::from_files([("adminsettings.xml", SETTINGS)]).unwrap();
        let settings = SettingsEdit {
            logo_path: Some("skins/black-unique/skinimages/customer_logo.png"),
            license_key: Some("KEY-42"),
            ..edit(TargetVersion::Scorm2004, EngineVariant::VariantA)
        };

        let (result, events) = run(&mut tree, settings);
        result.unwrap();

        let doc = document(&tree, "adminsettings.xml");
        assert_eq!(doc.lookup("KeyCode"), Lookup::Missing);
        assert!(
            events
                .iter()
                .any(|e| e.kind == EventKind::Warning && e.text.contains("<toplogo>"))
        );
    }

    #[test]
    fn test_missing_flag_is_a_warning() {
        let mut tree =
            MemoryTree::from_files([("adminsettings.xml", "<s><UseScorm>false</UseScorm></s>")]).unwrap();

        let (result, events) = run(&mut tree, edit(TargetVersion::Scorm12, EngineVariant::VariantB));

        assert_eq!(result.unwrap().updated.len(), 1);
        let warnings = events.iter().filter(|e| e.kind == EventKind::Warning).count();
        assert_eq!(warnings, 5);
    }

    #[test]
    fn test_unparseable_document_is_not_fatal() {
        let mut tree = MemoryTree::from_files([
            ("a/adminsettings.xml", "<broken>"),
            ("b/adminsettings.xml", SETTINGS),
        ])
        .unwrap();

        let (result, events) = run(&mut tree, edit(TargetVersion::Scorm2004, EngineVariant::VariantB));
        let report = result.unwrap();

        assert_eq!(report.failed, vec!["a/adminsettings.xml".to_string()]);
        assert_eq!(report.updated, vec!["b/adminsettings.xml".to_string()]);
        assert!(
            events
                .iter()
                .any(|e| e.kind == EventKind::Error && e.text.starts_with("Failed to edit a/adminsettings.xml"))
        );
        assert_eq!(tree.read("a/adminsettings.xml").unwrap(), b"<broken>");
    }

    #[test]
    fn test_no_document_is_fatal() {
        let mut tree = MemoryTree::from_files([("imsmanifest.xml", "<manifest/>")]).unwrap();
        let (result, _) = run(&mut tree, edit(TargetVersion::Scorm12, EngineVariant::VariantA));
        let err = result.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(err.to_string().contains("adminsettings.xml"));
    }
}
