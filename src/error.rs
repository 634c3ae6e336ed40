use thiserror::Error;

/// Every failure the item sources and the sync layer can surface.
///
/// The type is `Clone` because a single in-flight operation hands the same
/// outcome to all of its callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("cannot load items without required context: {0}")]
  MissingContext(String),
  #[error("network error: {0}")]
  Network(String),
  #[error("web service error [{code}]: {message}")]
  WebService { code: String, message: String },
  #[error("malformed data for {identity}: {reason}")]
  Decode { identity: String, reason: String },
  #[error("offline storage error: {0}")]
  Storage(String),
  #[error("fixture error: {0}")]
  Fixture(String),
}

impl Error {
  pub fn web_service(code: impl Into<String>, message: impl Into<String>) -> Self {
    Error::WebService { code: code.into(), message: message.into() }
  }

  /// Errors returned by the remote site itself (validation, permissions),
  /// as opposed to failing to reach it.
  pub fn is_web_service_error(&self) -> bool {
    matches!(self, Error::WebService { .. })
  }
}

impl From<std::io::Error> for Error {
  fn from(err: std::io::Error) -> Self {
    Error::Fixture(err.to_string())
  }
}
