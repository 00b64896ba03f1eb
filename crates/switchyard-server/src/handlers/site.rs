//! Site root actions.

use std::path::{Component, Path, PathBuf};
use switchyard::{
    async_trait, ActionRequest, ContentTypes, DispatchConfig, ExecuteError, HandlerParams,
    RawHandler, ResponseSink, TextHandler, TextWriter,
};
use tracing::debug;

fn site_root(config: &HandlerParams) -> Result<String, ExecuteError> {
    config
        .get(DispatchConfig::SITE_ROOT_PARAM)
        .ok_or_else(|| ExecuteError::new("Site root is not configured"))
}

/// Resolve `relative` under `root`, refusing anything that could escape it.
fn resolve_under(root: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || relative.as_os_str().is_empty() {
        return None;
    }
    Some(root.join(relative))
}

/// Prints the configured site root as plain text.
pub struct SiteRoot;

#[async_trait]
impl TextHandler for SiteRoot {
    fn content_type(&self) -> &str {
        ContentTypes::TEXT
    }

    async fn process(
        &self,
        _request: &ActionRequest,
        out: &mut TextWriter<'_>,
        config: &HandlerParams,
    ) -> Result<(), ExecuteError> {
        out.print(&site_root(config)?);
        Ok(())
    }
}

/// Streams a file below the site root as an attachment.
///
/// The file is named by the `file` request parameter.
pub struct Download;

#[async_trait]
impl RawHandler for Download {
    async fn process(
        &self,
        request: &ActionRequest,
        response: &mut ResponseSink,
        config: &HandlerParams,
    ) -> Result<(), ExecuteError> {
        let root = site_root(config)?;
        let name = request
            .parameter("file")
            .ok_or_else(|| ExecuteError::new("Missing required parameter: file"))?;
        let path = resolve_under(Path::new(&root), name)
            .ok_or_else(|| ExecuteError::new(format!("Invalid file name: {}", name)))?;

        debug!("Serving {}", path.display());
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| ExecuteError::logged(format!("Failed to read {}", name), &e))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        response.set_content_type(ContentTypes::OCTET_STREAM);
        response.set_content_disposition(format!("attachment; filename=\"{}\"", file_name));
        response.write(&data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard::Handler;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_under() {
        let root = Path::new("/srv/www");
        assert_eq!(
            resolve_under(root, "docs/a.txt"),
            Some(PathBuf::from("/srv/www/docs/a.txt"))
        );
        assert_eq!(resolve_under(root, "../etc/passwd"), None);
        assert_eq!(resolve_under(root, "/etc/passwd"), None);
        assert_eq!(resolve_under(root, ""), None);
    }

    #[tokio::test]
    async fn test_site_root_text() {
        let handler = Handler::text(SiteRoot);
        handler.configure("siteRoot", "/srv/www");
        let mut sink = ResponseSink::new();
        {
            let mut out = sink.writer();
            handler
                .process_text(&ActionRequest::new(), &mut out)
                .await
                .unwrap();
        }
        assert_eq!(sink.body_text(), "/srv/www");
    }

    #[tokio::test]
    async fn test_site_root_unconfigured() {
        let handler = Handler::text(SiteRoot);
        let mut sink = ResponseSink::new();
        let mut out = sink.writer();
        let err = handler
            .process_text(&ActionRequest::new(), &mut out)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Site root is not configured");
    }

    #[tokio::test]
    async fn test_download() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("report.csv"), b"a,b\n1,2\n").unwrap();

        let handler = Handler::raw(Download);
        handler.configure("siteRoot", temp_dir.path().to_string_lossy());
        let request = ActionRequest::new().with_parameter("file", "report.csv");
        let mut sink = ResponseSink::new();
        handler.process_raw(&request, &mut sink).await.unwrap();

        assert_eq!(sink.content_type(), Some(ContentTypes::OCTET_STREAM));
        assert_eq!(
            sink.header("Content-Disposition"),
            Some("attachment; filename=\"report.csv\"")
        );
        assert_eq!(sink.body(), b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_download_rejects_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let handler = Handler::raw(Download);
        handler.configure("siteRoot", temp_dir.path().to_string_lossy());
        let request = ActionRequest::new().with_parameter("file", "../secret");
        let mut sink = ResponseSink::new();

        let err = handler.process_raw(&request, &mut sink).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid file name: ../secret");
        assert!(sink.body().is_empty());
    }

    #[tokio::test]
    async fn test_download_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let handler = Handler::raw(Download);
        handler.configure("siteRoot", temp_dir.path().to_string_lossy());
        let request = ActionRequest::new().with_parameter("file", "nope.txt");
        let mut sink = ResponseSink::new();

        let err = handler.process_raw(&request, &mut sink).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to read nope.txt");
        assert!(sink.content_type().is_none());
    }
}
