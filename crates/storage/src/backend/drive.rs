//! Google Drive storage backend.
//!
//! Talks to the Drive v2 REST API with a bearer token. Acquiring and renewing
//! that token is the caller's problem; this backend only ever presents it.
//!
//! Three endpoints are used:
//! - `GET files` with a field mask, for the paginated listing,
//! - `GET files/{id}` with a field mask, to resolve a download URL,
//! - `GET {downloadUrl}`, for the bytes themselves.

use crate::backend::{BoxSyncRead, RemoteBackend};
use crate::error::{ErrorKind, Result};
use crate::models::{Download, FileId, ListPage, RemoteFile};
use async_trait::async_trait;
use exn::ResultExt;
use futures::TryStreamExt;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio_util::io::{StreamReader, SyncIoBridge};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/drive/v2";
/// Largest page the listing endpoint will honour.
pub const MAX_PAGE_SIZE: u32 = 1000;
const LIST_FIELDS: &str = "nextPageToken,items(id,fileExtension,fileSize,title)";
const LOCATE_FIELDS: &str = "downloadUrl,fileSize";

/// Tunables for [`DriveBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveOptions {
    /// Base URL of the Drive v2 API, without trailing slash.
    pub api_base: String,
    /// Files requested per listing page, clamped to `1..=1000`.
    pub page_size: u32,
    /// Timeout for metadata requests (listing, locate). Downloads are not
    /// subject to it.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}
impl Default for DriveOptions {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            page_size: MAX_PAGE_SIZE,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<DriveFile>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    file_extension: Option<String>,
    // Drive encodes int64 values as JSON strings.
    file_size: Option<String>,
    title: Option<String>,
}
impl DriveFile {
    fn into_remote(self) -> RemoteFile {
        let size = parse_size(self.file_size.as_deref());
        let title = self.title.unwrap_or_else(|| self.id.clone());
        let extension = self.file_extension.filter(|e| !e.is_empty());
        RemoteFile::new(self.id, title, size).with_extension(extension)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveDownload {
    download_url: Option<String>,
    file_size: Option<String>,
}

/// Folders and native documents carry no size; treat them as empty.
fn parse_size(value: Option<&str>) -> u64 {
    value.and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Google Drive backend.
///
/// # Examples
///
/// ```no_run
/// use cumulus_storage::backend::{DriveBackend, DriveOptions};
///
/// # fn example() -> cumulus_storage::error::Result<()> {
/// let backend = DriveBackend::new("drive", "ya29.access-token", DriveOptions::default())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DriveBackend {
    name: String,
    http: Client,
    api_base: String,
    access_token: String,
    page_size: u32,
    timeout: Duration,
}

impl DriveBackend {
    /// Create a new Drive backend bound to a bearer access token.
    pub fn new(name: impl Into<String>, access_token: impl Into<String>, options: DriveOptions) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(options.connect_timeout)
            .user_agent(format!("cumulus/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::Network("could not build HTTP client".to_string()))?;
        Ok(Self {
            name: name.into(),
            http,
            api_base: options.api_base.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            page_size: options.page_size.clamp(1, MAX_PAGE_SIZE),
            timeout: options.timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Authenticate and send a request, turning non-success statuses into
    /// errors. When `id` is given a 404 is reported as that file missing.
    async fn send(&self, request: RequestBuilder, id: Option<&FileId>) -> Result<Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("request to backend `{}` failed", self.name)))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        tracing::debug!(backend = %self.name, status = %status, "Remote request rejected");
        // The response is dropped here, which releases the connection.
        let kind = match (status, id) {
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => ErrorKind::PermissionDenied(status.to_string()),
            (StatusCode::NOT_FOUND, Some(id)) => ErrorKind::NotFound(id.clone()),
            _ => ErrorKind::Status(status.to_string()),
        };
        exn::bail!(kind)
    }
}
impl fmt::Debug for DriveBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveBackend")
            .field("name", &self.name)
            .field("api_base", &self.api_base)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteBackend for DriveBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_page(&self, page_token: Option<&str>) -> Result<ListPage> {
        let mut request = self
            .http
            .get(self.endpoint("files"))
            .query(&[("maxResults", self.page_size.to_string()), ("fields", LIST_FIELDS.to_string())])
            .timeout(self.timeout);
        if let Some(token) = page_token.filter(|t| !t.is_empty()) {
            request = request.query(&[("pageToken", token)]);
        }
        let response = self.send(request, None).await?;
        let list: FileList =
            response.json().await.or_raise(|| ErrorKind::InvalidResponse("malformed file listing".to_string()))?;
        Ok(ListPage {
            files: list.items.into_iter().map(DriveFile::into_remote).collect(),
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn locate(&self, id: &FileId) -> Result<Download> {
        let request = self
            .http
            .get(self.endpoint(&format!("files/{id}")))
            .query(&[("fields", LOCATE_FIELDS)])
            .timeout(self.timeout);
        let response = self.send(request, Some(id)).await?;
        let file: DriveDownload = response
            .json()
            .await
            .or_raise(|| ErrorKind::InvalidResponse(format!("malformed metadata for file {id}")))?;
        let Some(url) = file.download_url.filter(|u| !u.is_empty()) else {
            exn::bail!(ErrorKind::NotDownloadable(id.clone()));
        };
        Ok(Download {
            id: id.clone(),
            url,
            size: parse_size(file.file_size.as_deref()),
        })
    }

    async fn open(&self, download: &Download) -> Result<BoxSyncRead> {
        let response = self.send(self.http.get(&download.url), None).await?;
        let body = response.bytes_stream().map_err(std::io::Error::other);
        let reader = StreamReader::new(Box::pin(body));
        // Must be constructed inside the runtime; read it from a blocking
        // thread only.
        Ok(Box::new(SyncIoBridge::new(reader)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::io::Read;
    use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "test-token";

    fn backend(server: &MockServer, page_size: u32) -> DriveBackend {
        let options = DriveOptions {
            api_base: server.uri(),
            page_size,
            ..DriveOptions::default()
        };
        DriveBackend::new("drive", TOKEN, options).unwrap()
    }

    #[rstest]
    #[case(Some("1024"), 1024)]
    #[case(Some("not a number"), 0)]
    #[case(None, 0)]
    fn test_parse_size(#[case] value: Option<&str>, #[case] expected: u64) {
        assert_eq!(parse_size(value), expected);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(250, 250)]
    #[case(5000, MAX_PAGE_SIZE)]
    fn test_page_size_clamped(#[case] requested: u32, #[case] expected: u32) {
        let options = DriveOptions {
            page_size: requested,
            ..DriveOptions::default()
        };
        let backend = DriveBackend::new("drive", TOKEN, options).unwrap();
        assert_eq!(backend.page_size, expected);
    }

    #[test]
    fn test_debug_hides_token() {
        let backend = DriveBackend::new("drive", TOKEN, DriveOptions::default()).unwrap();
        assert!(!format!("{backend:?}").contains(TOKEN));
    }

    #[tokio::test]
    async fn test_list_page_requests_metadata_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param("maxResults", "2"))
            .and(query_param("fields", LIST_FIELDS))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nextPageToken": "page-2",
                "items": [
                    {"id": "a1", "fileExtension": "flac", "fileSize": "2048", "title": "Intro.flac"},
                    {"id": "b2", "title": "Folder"},
                ],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = backend(&server, 2).list_page(None).await.unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("page-2"));
        assert_eq!(page.files.len(), 2);
        assert_eq!(page.files[0].id.as_str(), "a1");
        assert_eq!(page.files[0].extension.as_deref(), Some("flac"));
        assert_eq!(page.files[0].size, 2048);
        assert_eq!(page.files[1].extension, None);
        assert_eq!(page.files[1].size, 0);
    }

    #[tokio::test]
    async fn test_list_stream_follows_page_tokens() {
        let server = MockServer::start().await;
        Mock::given(path("/files"))
            .and(query_param_is_missing("pageToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nextPageToken": "p2",
                "items": [{"id": "one", "title": "one.mp3", "fileExtension": "mp3", "fileSize": "1"}],
            })))
            .mount(&server)
            .await;
        Mock::given(path("/files"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nextPageToken": "",
                "items": [{"id": "two", "title": "two.mp3", "fileExtension": "mp3", "fileSize": "2"}],
            })))
            .mount(&server)
            .await;

        let files = backend(&server, 1).list().await.unwrap();
        let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["one", "two"]);
    }

    #[rstest]
    #[case(401, "permission")]
    #[case(403, "permission")]
    #[case(500, "status")]
    #[tokio::test]
    async fn test_list_page_failures(#[case] status: u16, #[case] expected: &str) {
        let server = MockServer::start().await;
        Mock::given(path("/files")).respond_with(ResponseTemplate::new(status)).mount(&server).await;
        let err = backend(&server, 10).list_page(None).await.unwrap_err();
        match (&*err, expected) {
            (ErrorKind::PermissionDenied(_), "permission") => {},
            (ErrorKind::Status(text), "status") => assert_eq!(text, "500 Internal Server Error"),
            (other, _) => panic!("unexpected error kind: {other}"),
        }
    }

    #[tokio::test]
    async fn test_list_page_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(path("/files"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;
        let err = backend(&server, 10).list_page(None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_locate() {
        let server = MockServer::start().await;
        let download_url = format!("{}/download/a1", server.uri());
        Mock::given(path("/files/a1"))
            .and(query_param("fields", LOCATE_FIELDS))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"downloadUrl": download_url, "fileSize": "5"})),
            )
            .mount(&server)
            .await;
        let download = backend(&server, 10).locate(&FileId::from("a1")).await.unwrap();
        assert_eq!(download.url, download_url);
        assert_eq!(download.size, 5);
    }

    #[tokio::test]
    async fn test_locate_not_found() {
        let server = MockServer::start().await;
        Mock::given(path("/files/gone")).respond_with(ResponseTemplate::new(404)).mount(&server).await;
        let err = backend(&server, 10).locate(&FileId::from("gone")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(id) if id.as_str() == "gone"));
    }

    #[tokio::test]
    async fn test_locate_native_document() {
        let server = MockServer::start().await;
        Mock::given(path("/files/doc")).respond_with(ResponseTemplate::new(200).set_body_json(json!({}))).mount(&server).await;
        let err = backend(&server, 10).locate(&FileId::from("doc")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotDownloadable(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_streams_body() {
        let server = MockServer::start().await;
        Mock::given(path("/download/a1"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
            .mount(&server)
            .await;
        let download = Download {
            id: FileId::from("a1"),
            url: format!("{}/download/a1", server.uri()),
            size: 5,
        };
        let mut reader = backend(&server, 10).open(&download).await.unwrap();
        let body = tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).map(|_| buf)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn test_open_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(path("/download/a1")).respond_with(ResponseTemplate::new(404)).mount(&server).await;
        let download = Download {
            id: FileId::from("a1"),
            url: format!("{}/download/a1", server.uri()),
            size: 5,
        };
        let err = backend(&server, 10).open(&download).await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::Status(text) if text == "404 Not Found"));
    }
}
