//! Integration tests for the download module and the manifest source.
//!
//! These tests verify page streaming, whole-chapter semantics, and manifest
//! parsing against mock HTTP servers.

use std::sync::Arc;

use seriesdl::{
    ChapterDownloader, DownloadError, FetchError, ManifestSource, PageClient, SeriesSource,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to mount a page endpoint returning the given bytes.
async fn mount_page(server: &MockServer, page_path: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_page_client_preserves_content() {
    let server = MockServer::start().await;
    let content = b"fake image bytes\x00\x01\x02";
    mount_page(&server, "/p/001.jpg", content).await;
    let temp_dir = TempDir::new().unwrap();

    let client = PageClient::new();
    let dest = temp_dir.path().join("001.jpg");
    let url = format!("{}/p/001.jpg", server.uri());
    let bytes = client.download_page(&url, &dest).await.unwrap();

    assert_eq!(bytes, content.len() as u64);
    let written = std::fs::read(&dest).unwrap();
    assert_eq!(written, content, "downloaded content should match original");
}

#[tokio::test]
async fn test_page_client_reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp_dir = TempDir::new().unwrap();

    let client = PageClient::new();
    let url = format!("{}/p/missing.jpg", server.uri());
    let result = client
        .download_page(&url, &temp_dir.path().join("missing.jpg"))
        .await;

    assert!(matches!(
        result,
        Err(DownloadError::HttpStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_page_client_rejects_invalid_url() {
    let temp_dir = TempDir::new().unwrap();
    let client = PageClient::new();
    let result = client
        .download_page("not-a-url", &temp_dir.path().join("x.jpg"))
        .await;
    assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
}

/// Mounts a full chapter: manifest plus three pages with mixed extensions.
async fn mount_chapter(server: &MockServer) -> String {
    let pages = vec![
        format!("{}/p/one.jpg", server.uri()),
        format!("{}/p/two.png", server.uri()),
        format!("{}/p/three", server.uri()),
    ];
    Mock::given(method("GET"))
        .and(path("/c/1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "pages": pages
        })))
        .mount(server)
        .await;
    mount_page(server, "/p/one.jpg", b"one").await;
    mount_page(server, "/p/two.png", b"two").await;
    mount_page(server, "/p/three", b"three").await;
    format!("{}/c/1.json", server.uri())
}

#[tokio::test]
async fn test_chapter_downloader_writes_numbered_pages() {
    let server = MockServer::start().await;
    let chapter_url = mount_chapter(&server).await;
    let output = TempDir::new().unwrap();

    let downloader = ChapterDownloader::new(Arc::new(ManifestSource::new()), PageClient::new(), 4);
    let chapter_dir = downloader
        .download(&chapter_url, "My Series", "01_Chapter_1", output.path())
        .await
        .unwrap();

    assert_eq!(
        chapter_dir,
        output.path().join("My_Series").join("01_Chapter_1")
    );
    // Ordinal names with URL-derived extensions; fallback is .jpg
    assert_eq!(
        std::fs::read(chapter_dir.join("001.jpg")).unwrap(),
        b"one"
    );
    assert_eq!(
        std::fs::read(chapter_dir.join("002.png")).unwrap(),
        b"two"
    );
    assert_eq!(
        std::fs::read(chapter_dir.join("003.jpg")).unwrap(),
        b"three"
    );
}

#[tokio::test]
async fn test_chapter_downloader_fails_chapter_on_any_page_error() {
    let server = MockServer::start().await;
    let pages = vec![
        format!("{}/p/good.jpg", server.uri()),
        format!("{}/p/bad.jpg", server.uri()),
    ];
    Mock::given(method("GET"))
        .and(path("/c/2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "pages": pages
        })))
        .mount(&server)
        .await;
    mount_page(&server, "/p/good.jpg", b"good").await;
    Mock::given(method("GET"))
        .and(path("/p/bad.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();

    let downloader = ChapterDownloader::new(Arc::new(ManifestSource::new()), PageClient::new(), 4);
    let result = downloader
        .download(
            &format!("{}/c/2.json", server.uri()),
            "My Series",
            "02_Chapter_2",
            output.path(),
        )
        .await;

    assert!(result.is_err(), "one failed page must fail the chapter");
    // The successful page remains on disk for the retry to overwrite
    let partial = output
        .path()
        .join("My_Series")
        .join("02_Chapter_2")
        .join("001.jpg");
    assert!(partial.exists(), "partial pages are left in place");
}

#[tokio::test]
async fn test_chapter_downloader_empty_page_list_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/c/3.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "pages": []
        })))
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();

    let downloader = ChapterDownloader::new(Arc::new(ManifestSource::new()), PageClient::new(), 4);
    let result = downloader
        .download(
            &format!("{}/c/3.json", server.uri()),
            "My Series",
            "03_Chapter_3",
            output.path(),
        )
        .await;

    assert!(matches!(result, Err(DownloadError::NoPages { .. })));
}

#[tokio::test]
async fn test_manifest_source_fetches_series_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/series.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title": "Example Series",
            "chapters": [
                {"url": "https://example.com/c/1", "title": "One"},
                {"url": "https://example.com/c/2", "title": "Two"}
            ]
        })))
        .mount(&server)
        .await;

    let source = ManifestSource::new();
    let info = source
        .fetch_metadata(&format!("{}/series.json", server.uri()))
        .await
        .unwrap();

    assert_eq!(info.title, "Example Series");
    assert_eq!(info.chapters.len(), 2);
    assert_eq!(info.chapters[0].title, "One");
    assert_eq!(info.chapters[1].url, "https://example.com/c/2");
}

#[tokio::test]
async fn test_manifest_source_reports_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/series.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = ManifestSource::new();
    let result = source
        .fetch_metadata(&format!("{}/series.json", server.uri()))
        .await;

    assert!(matches!(
        result,
        Err(FetchError::HttpStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_manifest_source_reports_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/series.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("this is not json"))
        .mount(&server)
        .await;

    let source = ManifestSource::new();
    let result = source
        .fetch_metadata(&format!("{}/series.json", server.uri()))
        .await;

    assert!(matches!(result, Err(FetchError::Parse { .. })));
}

#[tokio::test]
async fn test_manifest_source_chapter_pages() {
    let server = MockServer::start().await;
    let chapter_url = mount_chapter(&server).await;

    let source = ManifestSource::new();
    let pages = source.chapter_pages(&chapter_url).await.unwrap();
    assert_eq!(pages.len(), 3);
    assert!(pages[0].ends_with("/p/one.jpg"));
}

#[tokio::test]
async fn test_chapter_downloader_page_list_failure_is_pages_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/c/4.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();

    let downloader = ChapterDownloader::new(Arc::new(ManifestSource::new()), PageClient::new(), 4);
    let result = downloader
        .download(
            &format!("{}/c/4.json", server.uri()),
            "My Series",
            "04_Chapter_4",
            output.path(),
        )
        .await;

    assert!(matches!(result, Err(DownloadError::Pages { .. })));
}
