use crate::error::{PipelineError, ResourceContext};
use crate::models::EngineVariant;
use crate::progress::ProgressReporter;
use crate::tree::PackageTree;

/// License stage.
///
/// VariantA keeps its key in a data file that already ships with the package;
/// the file's whole content is replaced by the key. A package without that
/// file does not have the layout its detected variant implies, which is
/// fatal. VariantB keeps the key in configuration tags, so this stage only
/// announces that the settings editor will write it.
pub fn apply_license(
    tree: &mut dyn PackageTree,
    license_key: &str,
    variant: EngineVariant,
    progress: &mut ProgressReporter<'_>,
) -> Result<(), PipelineError> {
    progress.step(format!("Applying license key for {}", variant));

    let Some(data_file) = variant.layout().license_file else {
        progress.action("License key will be written to the configuration documents.");
        return Ok(());
    };

    if !tree.exists(data_file) || tree.is_dir(data_file) {
        return Err(PipelineError::validation(format!(
            "'{}' not found in package for {} course.",
            data_file, variant
        )));
    }

    tree.write(data_file, license_key.as_bytes())
        .resource_context(|| format!("Could not write license key to {}", data_file))?;

    progress.action(format!("Overwrote '{}' with the new license key.", data_file));
    progress.success("License key applied.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressEvent;
    use crate::tree::MemoryTree;

    fn run(tree: &mut MemoryTree, variant: EngineVariant) -> (Result<(), PipelineError>, Vec<ProgressEvent>) {
        let mut events = Vec::new();
        let mut progress = ProgressReporter::new(&mut events);
        let result = apply_license(tree, "LIC-0001", variant, &mut progress);
        drop(progress);
        (result, events)
    }

    #[test]
    fn test_variant_a_replaces_data_file() {
        let mut tree = MemoryTree::from_files([
            ("scorm/api.js", "//"),
            ("js/data.xml", "<data>old license and more</data>"),
        ])
        .unwrap();

        let (result, _) = run(&mut tree, EngineVariant::VariantA);

        result.unwrap();
        assert_eq!(tree.read("js/data.xml").unwrap(), b"LIC-0001");
    }

    #[test]
    fn test_variant_a_without_data_file_is_fatal() {
        let mut tree = MemoryTree::from_files([("scorm/api.js", "//"), ("js/app.js", "//")]).unwrap();

        let (result, _) = run(&mut tree, EngineVariant::VariantA);

        let err = result.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(err.to_string().contains("js/data.xml"));
        assert!(!tree.exists("js/data.xml"));
    }

    #[test]
    fn test_variant_b_leaves_tree_untouched() {
        let mut tree = MemoryTree::from_files([("xmls/adminsettings.xml", "<s/>")]).unwrap();
        let before = tree.clone();

        let (result, events) = run(&mut tree, EngineVariant::VariantB);

        result.unwrap();
        assert_eq!(tree, before);
        assert_eq!(events.len(), 2);
    }
}
