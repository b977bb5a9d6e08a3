use std::fmt;

/// Authoring-engine generation of a package.
///
/// Derived from the extracted tree by
/// [`detect_engine_variant`](crate::services::detect_engine_variant), never
/// supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineVariant {
    /// Legacy engine ("iengine5"): carries a `scorm/` runtime folder
    VariantA,
    /// Current engine ("iengine6")
    VariantB,
}

/// Variant-specific file layout and tag names.
///
/// All behavior that differs between the two engines is expressed as data in
/// this table so the stages themselves stay variant-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineLayout {
    /// Directory (relative to the package root) the branding logo is placed in
    pub logo_dir: &'static str,
    /// Fixed logo file name, `None` when the caller-supplied name is used
    pub logo_file_name: Option<&'static str>,
    /// Prefix of the path written into the configuration logo tags
    pub logo_config_prefix: &'static str,
    /// Configuration tags that receive the logo path
    pub logo_tags: &'static [&'static str],
    /// Data file overwritten with the license key, `None` when the license
    /// is written into configuration tags instead
    pub license_file: Option<&'static str>,
    /// Configuration tag holding the license key
    pub license_key_tag: Option<&'static str>,
    /// Configuration tag enabling the license check
    pub license_check_tag: Option<&'static str>,
}

const VARIANT_A_LAYOUT: EngineLayout = EngineLayout {
    logo_dir: "skins/black-unique/skinimages",
    logo_file_name: Some("customer_logo.png"),
    logo_config_prefix: "skins/black-unique/skinimages/",
    logo_tags: &["toplogo"],
    license_file: Some("js/data.xml"),
    license_key_tag: None,
    license_check_tag: None,
};

const VARIANT_B_LAYOUT: EngineLayout = EngineLayout {
    logo_dir: "xmls",
    logo_file_name: None,
    logo_config_prefix: "../",
    logo_tags: &["TopLogo", "CustomerLogo"],
    license_file: None,
    license_key_tag: Some("KeyCode"),
    license_check_tag: Some("EnableCheck"),
};

impl EngineVariant {
    /// Top-level directory whose presence marks a VariantA package
    pub const MARKER_DIR: &'static str = "scorm";

    pub fn layout(self) -> &'static EngineLayout {
        match self {
            Self::VariantA => &VARIANT_A_LAYOUT,
            Self::VariantB => &VARIANT_B_LAYOUT,
        }
    }

    /// Engine name as used by the authoring tool
    pub fn engine_name(self) -> &'static str {
        match self {
            Self::VariantA => "iengine5",
            Self::VariantB => "iengine6",
        }
    }
}

impl fmt::Display for EngineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.engine_name())
    }
}
