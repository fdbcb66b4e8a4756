/// Shared error type used across all ChatRelay crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("store: {0}")]
    Store(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Short machine-friendly name of the error kind, used in terminal
    /// error chunks so callers see a stable tag rather than a full
    /// message that may contain provider internals.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Http(_) => "http",
            Error::Provider { .. } => "provider",
            Error::Store(_) => "store",
            Error::Auth(_) => "auth",
            Error::Config(_) => "config",
            Error::Other(_) => "other",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_for_provider_errors() {
        let e = Error::Provider {
            provider: "openai".into(),
            message: "rate limited".into(),
        };
        assert_eq!(e.kind(), "provider");
        assert_eq!(e.to_string(), "provider openai: rate limited");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: Error = io.into();
        assert_eq!(e.kind(), "io");
    }
}
