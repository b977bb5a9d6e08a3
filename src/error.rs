use std::io;
use thiserror::Error;

/// Errors that abort a processing job.
///
/// Every stage returns `Result<T, PipelineError>`; the orchestrator turns the
/// first `Err` into the terminal failure event and skips the remaining stages.
/// Non-fatal problems never become a `PipelineError`, they are emitted as
/// warning events instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The package (or request) does not satisfy a structural requirement
    #[error("{0}")]
    Validation(String),

    /// A filesystem operation the pipeline cannot proceed without failed
    #[error("{context}: {source}")]
    Resource {
        context: String,
        #[source]
        source: io::Error,
    },

    /// An optional input (logo, reference script) is unusable
    #[error("{0}")]
    Asset(String),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn asset(message: impl Into<String>) -> Self {
        Self::Asset(message.into())
    }

    pub fn resource(context: impl Into<String>, source: io::Error) -> Self {
        Self::Resource {
            context: context.into(),
            source,
        }
    }

    /// Short machine-friendly name of the error kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Resource { .. } | Self::Archive(_) => "resource",
            Self::Asset(_) => "asset",
            Self::Xml(_) => "resource",
        }
    }
}

/// Attach context to an `io::Result`, producing a [`PipelineError::Resource`].
pub trait ResourceContext<T> {
    fn resource_context<F, S>(self, context: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResourceContext<T> for io::Result<T> {
    fn resource_context<F, S>(self, context: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| PipelineError::resource(context(), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(PipelineError::validation("x").kind(), "validation");
        assert_eq!(PipelineError::asset("x").kind(), "asset");
        let err = PipelineError::resource("rename", io::Error::other("denied"));
        assert_eq!(err.kind(), "resource");
        assert_eq!(err.to_string(), "rename: denied");
    }

    #[test]
    fn test_resource_context() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result.resource_context(|| "Could not read js/data.xml").unwrap_err();
        assert!(matches!(err, PipelineError::Resource { .. }));
        assert!(err.to_string().starts_with("Could not read js/data.xml"));
    }
}
