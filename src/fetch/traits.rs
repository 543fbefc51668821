use futures_util::future::BoxFuture;

use crate::error::LoaderResult;

/// Text transport for page references. Any non-success response or
/// transport error resolves to [`LoaderError::FetchFailure`].
///
/// [`LoaderError::FetchFailure`]: crate::error::LoaderError::FetchFailure
pub trait Fetcher: Send + Sync {
    fn get_text(&self, url: &str) -> BoxFuture<'static, LoaderResult<String>>;
}
