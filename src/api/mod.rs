use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::model::{
    ChannelInfo, Collection, CollectionDraft, CollectionId, CollectionPatch, ImportRequest,
    ImportSummary, Page, PageBody, UploadResponse, Video, VideoDraft, VideoId, VideoPatch,
};

pub mod error;

pub use error::ApiError;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/";

/// The calls the feed and import components depend on.
#[async_trait]
pub trait CuraService: Send + Sync {
    async fn list_videos(
        &self,
        collection_id: CollectionId,
        skip: u32,
        limit: u32,
    ) -> Result<Page, ApiError>;

    async fn resolve_video_from_url(&self, url: &str) -> Result<VideoDraft, ApiError>;

    async fn add_video(
        &self,
        collection_id: CollectionId,
        draft: &VideoDraft,
    ) -> Result<Video, ApiError>;

    async fn get_channel_info(&self, collection_id: CollectionId) -> Result<ChannelInfo, ApiError>;

    async fn import_channel(
        &self,
        collection_id: CollectionId,
        request: &ImportRequest,
    ) -> Result<ImportSummary, ApiError>;
}

#[derive(Clone)]
pub struct CuraClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for CuraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CuraClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CuraClient {
    pub fn new() -> Result<Self, ApiError> {
        let base_url = Url::parse(DEFAULT_API_BASE)
            .map_err(|_| ApiError::InvalidRequest("invalid default API URL"))?;
        Self::with_base_url(base_url)
    }

    pub fn with_base_url(mut base_url: Url) -> Result<Self, ApiError> {
        // Url::join replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .user_agent(concat!("cura/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::from)?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|_| ApiError::InvalidRequest("invalid endpoint path"))
    }

    /// Prepare a request against `path`, relative to the base URL.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        Ok(self.http.request(method, url))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder.build()?;
        debug!(method = %request.method(), url = %request.url(), "sending request");
        let res = self.http.execute(request).await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = match res.text().await {
            Ok(body) => body,
            Err(err) => {
                debug!(%status, error = %err, "failed to read error body");
                String::new()
            }
        };
        let err = ApiError::from_status(status, &body);
        warn!(%status, error = %err, "request rejected");
        Err(err)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let res = self.execute(builder).await?;
        let body = res.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn fetch_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        self.execute(builder).await.map(|_| ())
    }

    fn json_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<RequestBuilder, ApiError> {
        Ok(self.request(method, path)?.json(body))
    }

    pub async fn list_collections(&self) -> Result<Vec<Collection>, ApiError> {
        self.fetch_json(self.request(Method::GET, "collections")?).await
    }

    pub async fn get_collection(&self, id: CollectionId) -> Result<Collection, ApiError> {
        self.fetch_json(self.request(Method::GET, &format!("collections/{}", id))?)
            .await
    }

    pub async fn create_collection(&self, draft: &CollectionDraft) -> Result<Collection, ApiError> {
        if draft.title.trim().is_empty() {
            return Err(ApiError::InvalidRequest("collection title must be non-empty"));
        }
        let collection: Collection = self
            .fetch_json(self.json_request(Method::POST, "collections", draft)?)
            .await?;
        info!(id = collection.id, title = %collection.title, "created collection");
        Ok(collection)
    }

    pub async fn update_collection(
        &self,
        id: CollectionId,
        patch: &CollectionPatch,
    ) -> Result<Collection, ApiError> {
        self.fetch_json(self.json_request(Method::PUT, &format!("collections/{}", id), patch)?)
            .await
    }

    pub async fn delete_collection(&self, id: CollectionId) -> Result<(), ApiError> {
        self.fetch_empty(self.request(Method::DELETE, &format!("collections/{}", id))?)
            .await?;
        info!(id, "deleted collection");
        Ok(())
    }

    pub async fn list_videos(
        &self,
        collection_id: CollectionId,
        skip: u32,
        limit: u32,
    ) -> Result<Page, ApiError> {
        if limit == 0 {
            return Err(ApiError::InvalidRequest("limit must be > 0"));
        }
        let builder = self
            .request(Method::GET, &format!("collections/{}/videos", collection_id))?
            .query(&[("skip", skip), ("limit", limit)]);
        let body: PageBody = self.fetch_json(builder).await?;
        Ok(body.into_page(skip, limit))
    }

    pub async fn delete_all_videos(&self, collection_id: CollectionId) -> Result<(), ApiError> {
        self.fetch_empty(
            self.request(Method::DELETE, &format!("collections/{}/videos", collection_id))?,
        )
        .await?;
        info!(collection_id, "deleted all videos");
        Ok(())
    }

    pub async fn resolve_video_from_url(&self, url: &str) -> Result<VideoDraft, ApiError> {
        let builder = self
            .request(Method::POST, "videos/parse")?
            .query(&[("url", url)]);
        match self.fetch_json(builder).await {
            Err(ApiError::Rejected { status, message }) if status.is_client_error() => {
                Err(ApiError::Parse {
                    url: url.to_string(),
                    message,
                })
            }
            Err(ApiError::NotFound(message)) => Err(ApiError::Parse {
                url: url.to_string(),
                message,
            }),
            other => other,
        }
    }

    pub async fn add_video(
        &self,
        collection_id: CollectionId,
        draft: &VideoDraft,
    ) -> Result<Video, ApiError> {
        self.fetch_json(self.json_request(
            Method::POST,
            &format!("collections/{}/videos", collection_id),
            draft,
        )?)
        .await
    }

    pub async fn update_video(&self, id: VideoId, patch: &VideoPatch) -> Result<Video, ApiError> {
        self.fetch_json(self.json_request(Method::PUT, &format!("videos/{}", id), patch)?)
            .await
    }

    pub async fn delete_video(&self, id: VideoId) -> Result<(), ApiError> {
        self.fetch_empty(self.request(Method::DELETE, &format!("videos/{}", id))?)
            .await
    }

    pub async fn get_channel_info(
        &self,
        collection_id: CollectionId,
    ) -> Result<ChannelInfo, ApiError> {
        self.fetch_json(
            self.request(Method::GET, &format!("collections/{}/channel-info", collection_id))?,
        )
        .await
    }

    /// Server-side bulk import. Can run for minutes; no client timeout is set.
    pub async fn import_channel(
        &self,
        collection_id: CollectionId,
        request: &ImportRequest,
    ) -> Result<ImportSummary, ApiError> {
        if request.limit == 0 {
            return Err(ApiError::InvalidRequest("import limit must be > 0"));
        }
        let summary: ImportSummary = self
            .fetch_json(self.json_request(
                Method::POST,
                &format!("collections/{}/import", collection_id),
                request,
            )?)
            .await?;
        info!(collection_id, imported = ?summary.imported_count, "channel import finished");
        Ok(summary)
    }

    /// Upload a local image and return its public URL.
    pub async fn upload_image<P: AsRef<Path>>(&self, file_path: P) -> Result<String, ApiError> {
        let file_path = file_path.as_ref();
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(ApiError::InvalidRequest("invalid file name"))?
            .to_string();
        let content_type = image_content_type(file_path)
            .ok_or(ApiError::InvalidRequest("file must be a jpeg, png, gif or webp image"))?;

        let content = fs::read(file_path)
            .await
            .map_err(|e| ApiError::InvalidRequest(io_reason(e)))?;

        let part = Part::bytes(content)
            .file_name(file_name.clone())
            .mime_str(content_type)?;
        let builder = self
            .request(Method::POST, "upload/")?
            .multipart(Form::new().part("file", part));
        let uploaded: UploadResponse = self.fetch_json(builder).await?;
        info!(file = %file_name, url = %uploaded.url, "uploaded image");
        Ok(uploaded.url)
    }
}

fn io_reason(err: std::io::Error) -> &'static str {
    match err.kind() {
        std::io::ErrorKind::NotFound => "file does not exist",
        std::io::ErrorKind::PermissionDenied => "file is not readable",
        _ => "failed to read file",
    }
}

/// Content type for the image formats the upload endpoint accepts.
pub fn image_content_type(file_path: &Path) -> Option<&'static str> {
    match file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
    {
        Some(ext) if ext == "jpg" || ext == "jpeg" => Some("image/jpeg"),
        Some(ext) if ext == "png" => Some("image/png"),
        Some(ext) if ext == "gif" => Some("image/gif"),
        Some(ext) if ext == "webp" => Some("image/webp"),
        _ => None,
    }
}

#[async_trait]
impl CuraService for CuraClient {
    async fn list_videos(
        &self,
        collection_id: CollectionId,
        skip: u32,
        limit: u32,
    ) -> Result<Page, ApiError> {
        CuraClient::list_videos(self, collection_id, skip, limit).await
    }

    async fn resolve_video_from_url(&self, url: &str) -> Result<VideoDraft, ApiError> {
        CuraClient::resolve_video_from_url(self, url).await
    }

    async fn add_video(
        &self,
        collection_id: CollectionId,
        draft: &VideoDraft,
    ) -> Result<Video, ApiError> {
        CuraClient::add_video(self, collection_id, draft).await
    }

    async fn get_channel_info(&self, collection_id: CollectionId) -> Result<ChannelInfo, ApiError> {
        CuraClient::get_channel_info(self, collection_id).await
    }

    async fn import_channel(
        &self,
        collection_id: CollectionId,
        request: &ImportRequest,
    ) -> Result<ImportSummary, ApiError> {
        CuraClient::import_channel(self, collection_id, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> CuraClient {
        CuraClient::with_base_url(Url::parse(base).unwrap()).unwrap()
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let c = client("http://localhost:8000/api");
        assert_eq!(c.base_url().as_str(), "http://localhost:8000/api/");
        let req = c.request(Method::GET, "collections/7").unwrap().build().unwrap();
        assert_eq!(req.url().path(), "/api/collections/7");
    }

    #[test]
    fn list_videos_request_carries_paging() {
        let c = client("http://localhost:8000/api/");
        let req = c
            .request(Method::GET, "collections/1/videos")
            .unwrap()
            .query(&[("skip", 20u32), ("limit", 20u32)])
            .build()
            .unwrap();
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.url().query(), Some("skip=20&limit=20"));
    }

    #[test]
    fn json_request_sets_content_type() {
        let c = client("http://localhost:8000/api/");
        let patch = VideoPatch {
            title: Some("new".into()),
            ..Default::default()
        };
        let req = c
            .json_request(Method::PUT, "videos/4", &patch)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(req.method(), Method::PUT);
        assert_eq!(
            req.headers()
                .get("Content-Type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"title":"new"}"#);
    }

    #[test]
    fn image_types_by_extension() {
        assert_eq!(image_content_type(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(image_content_type(Path::new("cover.webp")), Some("image/webp"));
        assert_eq!(image_content_type(Path::new("clip.mp4")), None);
        assert_eq!(image_content_type(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected_before_sending() {
        let c = client("http://localhost:8000/api/");
        let err = c.list_videos(1, 0, 0).await.unwrap_err();
        assert_eq!(err, ApiError::InvalidRequest("limit must be > 0"));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let c = client(&format!("http://{}/api/", addr));
        let err = c.list_collections().await.unwrap_err();
        assert!(err.is_transport(), "expected transport error, got {:?}", err);
    }
}
