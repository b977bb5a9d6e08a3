use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// SCORM version a package is converted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetVersion {
    Scorm12,
    Scorm2004,
}

impl TargetVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scorm12 => "1.2",
            Self::Scorm2004 => "2004",
        }
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.2" => Ok(Self::Scorm12),
            "2004" => Ok(Self::Scorm2004),
            other => Err(format!(
                "Invalid SCORM target version '{}' (expected '1.2' or '2004')",
                other
            )),
        }
    }
}

/// Branding image supplied with a job
#[derive(Clone, PartialEq, Eq)]
pub struct LogoAsset {
    /// Sanitized file name the logo was uploaded under
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl LogoAsset {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        let file_name = sanitize_filename(file_name);
        Self {
            file_name: if file_name.is_empty() {
                "customer_logo.png".to_string()
            } else {
                file_name
            },
            bytes,
        }
    }
}

impl fmt::Debug for LogoAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoAsset")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// One processing request.
///
/// Created per request, consumed by a single pipeline run and never
/// persisted. The working directory is derived from the job id rather than
/// the uploaded file name so concurrent jobs never share a tree.
#[derive(Debug, Clone)]
pub struct PackageJob {
    pub id: Uuid,
    /// Uploaded archive; deleted when the job ends
    pub source_archive: Utf8PathBuf,
    /// Name the package was submitted under, used for the output name
    pub original_name: String,
    pub target_version: TargetVersion,
    /// Replace the runtime script with the customer-supplied reference copy
    pub customer_variant: bool,
    pub logo: Option<LogoAsset>,
    pub license_key: Option<String>,
}

impl PackageJob {
    pub fn new<P: AsRef<Utf8Path>>(source_archive: P, target_version: TargetVersion) -> Self {
        let source_archive = source_archive.as_ref().to_path_buf();
        let original_name = source_archive
            .file_name()
            .map(sanitize_filename)
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            source_archive,
            original_name,
            target_version,
            customer_variant: false,
            logo: None,
            license_key: None,
        }
    }

    pub fn with_original_name(mut self, name: &str) -> Self {
        self.original_name = sanitize_filename(name);
        self
    }

    pub fn with_customer_variant(mut self, enabled: bool) -> Self {
        self.customer_variant = enabled;
        self
    }

    pub fn with_logo(mut self, logo: Option<LogoAsset>) -> Self {
        self.logo = logo;
        self
    }

    /// Blank keys are treated as absent
    pub fn with_license_key(mut self, key: Option<String>) -> Self {
        self.license_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Exclusive working directory of this job under `base`
    pub fn working_dir(&self, base: &Utf8Path) -> Utf8PathBuf {
        base.join(format!("_work_{}", self.id.simple()))
    }

    fn output_stem(&self) -> &str {
        let name = self.original_name.as_str();
        let split = name.len().saturating_sub(4);
        let stem = match (name.get(..split), name.get(split..)) {
            (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(".zip") => stem,
            _ => name,
        };
        if stem.is_empty() { "package" } else { stem }
    }

    /// `<original stem>_processed_<version>.zip`
    pub fn output_name(&self) -> String {
        format!("{}_processed_{}.zip", self.output_stem(), self.target_version)
    }

    /// Output name tagged with this job's id, used when another job is
    /// already producing [`output_name`](Self::output_name)
    pub fn owned_output_name(&self) -> String {
        let id = self.id.simple().to_string();
        format!(
            "{}_processed_{}_{}.zip",
            self.output_stem(),
            self.target_version,
            &id[..8]
        )
    }
}

/// Reduce a caller-supplied file name to a safe, flat ASCII name.
///
/// Path separators become word breaks, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading/trailing `.`/`_` are
/// stripped. The result may be empty.
pub fn sanitize_filename(name: &str) -> String {
    let spaced = name.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}
