pub type LoaderResult<T> = Result<T, LoaderError>;

#[derive(thiserror::Error, Debug)]
pub enum LoaderError {
    #[error("there is no event called \"{name}\"")]
    UnknownEvent { name: String },
    #[error("extension \"{name}\" rejected: {reason}")]
    InvalidExtension { name: String, reason: String },
    #[error("fetch failed for {url}")]
    FetchFailure {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("malformed markup: {0}")]
    Markup(String),
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no async runtime: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

impl From<std::io::Error> for LoaderError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            context: "I/O operation failed".to_string(),
        }
    }
}

impl LoaderError {
    pub fn unknown_event(name: impl Into<String>) -> Self {
        Self::UnknownEvent { name: name.into() }
    }

    pub fn invalid_extension(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidExtension {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn fetch_failure(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::FetchFailure {
            url: url.into(),
            source: Box::new(source),
        }
    }

    pub fn markup(message: impl Into<String>) -> Self {
        Self::Markup(message.into())
    }

    pub fn io_with_context(source: std::io::Error, context: impl Into<String>) -> Self {
        Self::Io {
            source,
            context: context.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::FetchFailure { .. })
    }
}
