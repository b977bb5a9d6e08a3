use crate::error::{PipelineError, ResourceContext};
use crate::progress::ProgressReporter;
use crate::tree::PackageTree;
use camino::Utf8Path;
use regex::Regex;
use std::sync::LazyLock;

/// Runtime script patched for SCORM 2004
pub const SCORM_2004_SCRIPT: &str = "js/scorm_2004.js";

/// Engine script whose completion dialog is switched on by the extended fixes
pub const COURSE_ENGINE_SCRIPT: &str = "js/course-engine.js";

/// Legacy runtime script whose window-close call is fixed by the extended fixes
pub const SCORM_SCRIPT: &str = "js/scorm.js";

const LEGACY_COMMIT_CALL: &str = "LMSCommit()";
const SCORM_2004_COMMIT_CALL: &str = "SCORM2004_CallCommit()";

static DIALOG_HIDDEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"dialogisvisible(\s*[:=]\s*)false").expect("dialog pattern is a valid regex")
});

const CLOSE_CALLS: &[(&str, &str)] = &[
    ("'self.close();'", "'top.close();'"),
    ("\"self.close();\"", "\"top.close();\""),
];

/// How the script stage treats a job
#[derive(Debug, Clone, Copy)]
pub struct ScriptPatch<'a> {
    /// Replace the runtime script wholesale with the customer reference copy
    pub customer_variant: bool,
    /// Reference copy on the server, outside any package
    pub reference_script: &'a Utf8Path,
    /// Also apply the course-engine.js and scorm.js fixes
    pub extended_fixes: bool,
}

/// Script stage, only run for SCORM 2004 targets.
///
/// In customer-variant mode a missing reference copy or a missing in-package
/// script is fatal. In standard mode every problem is a warning: not every
/// engine build ships the script, and an already patched script has no
/// legacy commit call left.
pub fn patch_scripts(
    tree: &mut dyn PackageTree,
    patch: &ScriptPatch<'_>,
    progress: &mut ProgressReporter<'_>,
) -> Result<(), PipelineError> {
    progress.step("Editing JavaScript files for SCORM 2004");

    if patch.customer_variant {
        replace_with_reference(tree, patch.reference_script, progress)?;
    } else {
        replace_commit_call(tree, progress)?;
    }

    if patch.extended_fixes {
        enable_completion_dialog(tree, progress)?;
        fix_close_calls(tree, progress)?;
    }

    progress.success("JS file edits complete.");
    Ok(())
}

fn replace_with_reference(
    tree: &mut dyn PackageTree,
    reference: &Utf8Path,
    progress: &mut ProgressReporter<'_>,
) -> Result<(), PipelineError> {
    progress.action("Customer variant selected. Replacing scorm_2004.js...");

    let contents = match std::fs::read(reference) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::error!("Reference script {} unreadable: {}", reference, e);
            return Err(PipelineError::asset(format!(
                "Special customer file not found on server at: {}",
                reference
            )));
        }
    };

    if !tree.exists(SCORM_2004_SCRIPT) {
        return Err(PipelineError::asset(
            "Cannot replace scorm_2004.js because it does not exist in the package.",
        ));
    }

    tree.write(SCORM_2004_SCRIPT, &contents)
        .resource_context(|| format!("Could not replace {}", SCORM_2004_SCRIPT))?;
    progress.success("Replaced scorm_2004.js with the customer version.");
    Ok(())
}

/// Read a script as text; `None` (with a warning) when absent or not UTF-8
fn read_script(
    tree: &dyn PackageTree,
    path: &str,
    progress: &mut ProgressReporter<'_>,
) -> Result<Option<String>, PipelineError> {
    let name = crate::tree::file_name(path);
    if !tree.exists(path) {
        progress.warning(format!("'{}' not found. Skipping.", name));
        return Ok(None);
    }
    let bytes = tree.read(path).resource_context(|| format!("Could not read {}", path))?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Some(text)),
        Err(_) => {
            progress.warning(format!("'{}' is not valid UTF-8. Skipping.", name));
            Ok(None)
        }
    }
}

fn replace_commit_call(
    tree: &mut dyn PackageTree,
    progress: &mut ProgressReporter<'_>,
) -> Result<(), PipelineError> {
    progress.action(format!(
        "Standard processing. Replacing {} with {}...",
        LEGACY_COMMIT_CALL, SCORM_2004_COMMIT_CALL
    ));

    let Some(content) = read_script(tree, SCORM_2004_SCRIPT, progress)? else {
        return Ok(());
    };
    if !content.contains(LEGACY_COMMIT_CALL) {
        progress.warning(format!("'{}' not found. No changes made.", LEGACY_COMMIT_CALL));
        return Ok(());
    }

    let patched = content.replace(LEGACY_COMMIT_CALL, SCORM_2004_COMMIT_CALL);
    tree.write(SCORM_2004_SCRIPT, patched.as_bytes())
        .resource_context(|| format!("Could not write {}", SCORM_2004_SCRIPT))?;
    progress.success("Replacement complete.");
    Ok(())
}

fn enable_completion_dialog(
    tree: &mut dyn PackageTree,
    progress: &mut ProgressReporter<'_>,
) -> Result<(), PipelineError> {
    progress.action("Editing 'course-engine.js': Setting 'dialogisvisible' to true...");

    let Some(content) = read_script(tree, COURSE_ENGINE_SCRIPT, progress)? else {
        return Ok(());
    };
    if !DIALOG_HIDDEN.is_match(&content) {
        progress.warning("'dialogisvisible: false' not found. No changes made.");
        return Ok(());
    }

    let patched = DIALOG_HIDDEN.replace_all(&content, "dialogisvisible${1}true");
    tree.write(COURSE_ENGINE_SCRIPT, patched.as_bytes())
        .resource_context(|| format!("Could not write {}", COURSE_ENGINE_SCRIPT))?;
    progress.success("'dialogisvisible' set to true.");
    Ok(())
}

fn fix_close_calls(
    tree: &mut dyn PackageTree,
    progress: &mut ProgressReporter<'_>,
) -> Result<(), PipelineError> {
    progress.action("Editing 'scorm.js': Replacing 'self.close();' with 'top.close();'...");

    let Some(content) = read_script(tree, SCORM_SCRIPT, progress)? else {
        return Ok(());
    };
    let patched = CLOSE_CALLS
        .iter()
        .fold(content.clone(), |text, (from, to)| text.replace(from, to));
    if patched == content {
        progress.warning("'self.close();' not found. No changes made.");
        return Ok(());
    }

    tree.write(SCORM_SCRIPT, patched.as_bytes())
        .resource_context(|| format!("Could not write {}", SCORM_SCRIPT))?;
    progress.success("'self.close();' replaced.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{EventKind, ProgressEvent};
    use crate::tree::MemoryTree;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn run(tree: &mut MemoryTree, patch: ScriptPatch<'_>) -> (Result<(), PipelineError>, Vec<ProgressEvent>) {
        let mut events = Vec::new();
        let mut progress = ProgressReporter::new(&mut events);
        let result = patch_scripts(tree, &patch, &mut progress);
        drop(progress);
        (result, events)
    }

    fn standard(reference: &Utf8Path) -> ScriptPatch<'_> {
        ScriptPatch {
            customer_variant: false,
            reference_script: reference,
            extended_fixes: false,
        }
    }

    fn reference_file(dir: &TempDir, contents: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("scorm_2004.js")).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_standard_mode_replaces_every_commit_call() {
        let mut tree = MemoryTree::from_files([(
            SCORM_2004_SCRIPT,
            "function a(){ LMSCommit(); }\nfunction b(){ LMSCommit(); }",
        )])
        .unwrap();

        let (result, events) = run(&mut tree, standard(Utf8Path::new("unused.js")));

        result.unwrap();
        let text = String::from_utf8(tree.read(SCORM_2004_SCRIPT).unwrap()).unwrap();
        assert_eq!(text.matches("SCORM2004_CallCommit()").count(), 2);
        assert!(!text.contains("LMSCommit()"));
        assert!(events.iter().all(|e| e.kind != EventKind::Warning));
    }

    #[test]
    fn test_standard_mode_missing_token_or_file_warns() {
        let mut tree = MemoryTree::from_files([(SCORM_2004_SCRIPT, "SCORM2004_CallCommit();")]).unwrap();
        let (result, events) = run(&mut tree, standard(Utf8Path::new("unused.js")));
        result.unwrap();
        assert!(events.iter().any(|e| e.text == "'LMSCommit()' not found. No changes made."));

        let mut tree = MemoryTree::new();
        let (result, events) = run(&mut tree, standard(Utf8Path::new("unused.js")));
        result.unwrap();
        assert!(events.iter().any(|e| e.text == "'scorm_2004.js' not found. Skipping."));
        assert_eq!(tree.file_count(), 0);
    }

    #[test]
    fn test_customer_variant_copies_reference_byte_for_byte() {
        let dir = TempDir::new().unwrap();
        let reference = reference_file(&dir, "// customer runtime\nLMSCommit();\n");
        let mut tree = MemoryTree::from_files([(SCORM_2004_SCRIPT, "// stock runtime")]).unwrap();

        let patch = ScriptPatch {
            customer_variant: true,
            ..standard(&reference)
        };
        let (result, _) = run(&mut tree, patch);

        result.unwrap();
        assert_eq!(
            tree.read(SCORM_2004_SCRIPT).unwrap(),
            std::fs::read(&reference).unwrap()
        );
    }

    #[test]
    fn test_customer_variant_failures_are_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = Utf8PathBuf::from_path_buf(dir.path().join("absent.js")).unwrap();
        let mut tree = MemoryTree::from_files([(SCORM_2004_SCRIPT, "//")]).unwrap();
        let patch = ScriptPatch {
            customer_variant: true,
            ..standard(&missing)
        };
        let (result, _) = run(&mut tree, patch);
        assert!(matches!(result, Err(PipelineError::Asset(_))));

        let reference = reference_file(&dir, "// customer");
        let mut tree = MemoryTree::new();
        let patch = ScriptPatch {
            customer_variant: true,
            ..standard(&reference)
        };
        let (result, _) = run(&mut tree, patch);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("does not exist in the package"));
    }

    #[test]
    fn test_extended_fixes() {
        let mut tree = MemoryTree::from_files([
            (SCORM_2004_SCRIPT, "LMSCommit();"),
            (COURSE_ENGINE_SCRIPT, "var cfg = { dialogisvisible : false }; dialogisvisible=false;"),
            (SCORM_SCRIPT, "win.exec('self.close();'); win.exec(\"self.close();\");"),
        ])
        .unwrap();
        let patch = ScriptPatch {
            extended_fixes: true,
            ..standard(Utf8Path::new("unused.js"))
        };

        let (result, events) = run(&mut tree, patch);

        result.unwrap();
        let engine = String::from_utf8(tree.read(COURSE_ENGINE_SCRIPT).unwrap()).unwrap();
        assert_eq!(engine, "var cfg = { dialogisvisible : true }; dialogisvisible=true;");
        let scorm = String::from_utf8(tree.read(SCORM_SCRIPT).unwrap()).unwrap();
        assert_eq!(scorm, "win.exec('top.close();'); win.exec(\"top.close();\");");
        assert!(events.iter().all(|e| e.kind != EventKind::Warning));
    }

    #[test]
    fn test_extended_fixes_missing_files_warn() {
        let mut tree = MemoryTree::from_files([(SCORM_2004_SCRIPT, "LMSCommit();")]).unwrap();
        let patch = ScriptPatch {
            extended_fixes: true,
            ..standard(Utf8Path::new("unused.js"))
        };

        let (result, events) = run(&mut tree, patch);

        result.unwrap();
        let warnings = events.iter().filter(|e| e.kind == EventKind::Warning).count();
        assert_eq!(warnings, 2);
    }
}
