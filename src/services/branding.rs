use crate::error::PipelineError;
use crate::models::{EngineVariant, LogoAsset};
use crate::progress::ProgressReporter;
use crate::tree::{PackageTree, join};
use image::ImageFormat;
use image::imageops::FilterType;
use std::io::Cursor;

/// Canonical logo width in pixels
pub const LOGO_WIDTH: u32 = 300;

/// Canonical logo height in pixels
pub const LOGO_HEIGHT: u32 = 88;

/// Where the logo ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLogo {
    /// Logical path of the written PNG inside the package
    pub tree_path: String,
    /// Path string to write into the configuration logo tags
    pub config_path: String,
}

/// Branding stage: normalize the logo and place it into the package.
///
/// The image is decoded, resampled with Lanczos3 to exactly
/// [`LOGO_WIDTH`]×[`LOGO_HEIGHT`] when either dimension differs, and always
/// re-encoded as PNG. Encoding happens in memory before anything is written,
/// so a corrupt image never leaves a file behind. Configuration is not
/// touched here; the returned [`PlacedLogo::config_path`] is handed to the
/// settings editor.
pub fn prepare_logo(
    tree: &mut dyn PackageTree,
    logo: &LogoAsset,
    variant: EngineVariant,
    progress: &mut ProgressReporter<'_>,
) -> Result<PlacedLogo, PipelineError> {
    progress.step("Processing branding logo");

    let image = image::load_from_memory(&logo.bytes)
        .map_err(|e| PipelineError::asset(format!("Could not process logo: {}", e)))?;

    let image = if image.width() != LOGO_WIDTH || image.height() != LOGO_HEIGHT {
        progress.action(format!(
            "Resizing logo from {}x{} to {}x{}px.",
            image.width(),
            image.height(),
            LOGO_WIDTH,
            LOGO_HEIGHT
        ));
        image.resize_exact(LOGO_WIDTH, LOGO_HEIGHT, FilterType::Lanczos3)
    } else {
        image
    };

    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| PipelineError::asset(format!("Could not encode logo as PNG: {}", e)))?;

    let layout = variant.layout();
    let file_name = layout.logo_file_name.unwrap_or(logo.file_name.as_str());
    let placed = PlacedLogo {
        tree_path: join(layout.logo_dir, file_name),
        config_path: format!("{}{}", layout.logo_config_prefix, file_name),
    };

    if let Err(e) = tree.write(&placed.tree_path, &png) {
        if tree.exists(&placed.tree_path) {
            if let Err(cleanup) = tree.remove_file(&placed.tree_path) {
                tracing::warn!("Could not remove partial logo {}: {}", placed.tree_path, cleanup);
            }
        }
        return Err(PipelineError::resource(
            format!("Could not save logo to {}", placed.tree_path),
            e,
        ));
    }

    progress.action(format!("Saved logo to: {}", placed.tree_path));
    progress.success("Branding processed.");
    Ok(placed)
}
