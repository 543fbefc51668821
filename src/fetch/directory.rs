use std::path::{Component, Path, PathBuf};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::error::{LoaderError, LoaderResult};

use super::Fetcher;

const PAGE_EXTENSION: &str = "json";

/// Serves page references from a directory of markup files: `/page2` and
/// `page2.json` both resolve to `<root>/page2.json`.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    root: PathBuf,
}

impl DirectoryFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, url: &str) -> LoaderResult<PathBuf> {
        let trimmed = url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(LoaderError::invalid_argument(format!(
                "page reference \"{url}\" names no file"
            )));
        }

        let relative = Path::new(trimmed);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(LoaderError::invalid_argument(format!(
                "page reference \"{url}\" escapes the site directory"
            )));
        }

        let mut path = self.root.join(relative);
        if path.extension().is_none() {
            path.set_extension(PAGE_EXTENSION);
        }
        Ok(path)
    }
}

impl Fetcher for DirectoryFetcher {
    fn get_text(&self, url: &str) -> BoxFuture<'static, LoaderResult<String>> {
        let url = url.to_string();
        let resolved = self.resolve(&url);
        async move {
            let path = resolved.map_err(|err| LoaderError::fetch_failure(url.clone(), err))?;
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| LoaderError::fetch_failure(url, source))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::DirectoryFetcher;
    use crate::fetch::Fetcher;

    fn unique_temp_dir(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("ias_site_{suffix}_{}_{}", process::id(), nanos));
        path
    }

    #[test]
    fn resolve_maps_references_to_json_files() {
        let fetcher = DirectoryFetcher::new("/srv/site");
        assert_eq!(
            fetcher.resolve("/page2").expect("reference should resolve"),
            PathBuf::from("/srv/site/page2.json")
        );
        assert_eq!(
            fetcher
                .resolve("archive/page3.json?sort=new")
                .expect("reference should resolve"),
            PathBuf::from("/srv/site/archive/page3.json")
        );
    }

    #[test]
    fn resolve_rejects_escapes_and_empty_references() {
        let fetcher = DirectoryFetcher::new("/srv/site");
        assert!(fetcher.resolve("/").is_err());
        assert!(fetcher.resolve("../secret").is_err());
        assert!(fetcher.resolve("a/../../b").is_err());
    }

    #[tokio::test]
    async fn get_text_reads_pages_and_reports_missing_ones() {
        let dir = unique_temp_dir("fetch");
        fs::create_dir_all(&dir).expect("site dir should be created");
        fs::write(dir.join("page2.json"), "[]").expect("page should be written");

        let fetcher = DirectoryFetcher::new(&dir);
        let body = fetcher
            .get_text("/page2")
            .await
            .expect("existing page should load");
        assert_eq!(body, "[]");

        let err = fetcher
            .get_text("/page9")
            .await
            .expect_err("missing page should fail");
        assert!(err.is_fetch_failure());

        fs::remove_dir_all(&dir).expect("site dir should be removed");
    }
}
