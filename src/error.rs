use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the library.
#[derive(Debug, Error)]
pub enum Error {
    /// The input path does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The file extension does not name a point cloud format we can read.
    #[error("Unsupported point cloud format: {0}")]
    UnsupportedFormat(String),
    /// The file exists but its contents do not match the declared format.
    #[error("Format error: {path}: {message}")]
    Format { path: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
    /// Used when the user pass a logical invalid parameter to a function.
    #[error("Parameter error: {0}")]
    InvalidParameter(String),
    /// The viewer window could not be opened or rendered.
    #[error("Viewer error: {0}")]
    Viewer(String),
}

impl Error {
    /// Create a error with the kind `InvalidParameter`.
    /// # Arguments
    /// * `msg` - The error message.
    pub fn invalid_parameter<T: ToString>(msg: T) -> Self {
        Error::InvalidParameter(msg.to_string())
    }

    /// Create a error with the kind `Format`.
    /// # Arguments
    /// * `path` - The file being parsed.
    /// * `msg` - What went wrong.
    pub fn format<P: AsRef<std::path::Path>, T: ToString>(path: P, msg: T) -> Self {
        Error::Format {
            path: path.as_ref().display().to_string(),
            message: msg.to_string(),
        }
    }

    pub fn viewer<T: ToString>(msg: T) -> Self {
        Error::Viewer(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn test_messages_name_the_path() {
        let err = Error::NotFound("missing/cloud.ply".into());
        assert_eq!(err.to_string(), "File not found: missing/cloud.ply");

        let err = Error::format("cloud.pcd", "missing DATA line");
        assert_eq!(err.to_string(), "Format error: cloud.pcd: missing DATA line");
    }

    #[test]
    fn test_io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
