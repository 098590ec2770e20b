//! Bulk import: sequential URL batches and the channel-import flow.
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, CuraService};
use crate::feed::FeedAggregator;
use crate::links;
use crate::model::{Category, ChannelInfo, CollectionId, ImportRequest, ImportSummary, VideoId};

/// Default cap on videos pulled by a channel import.
pub const DEFAULT_IMPORT_LIMIT: u32 = 5000;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// One link to import, optionally pre-assigned to a category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchItem {
    pub url: String,
    pub category: Option<Category>,
}

impl BatchItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn is_blank(&self) -> bool {
        self.url.trim().is_empty()
    }

    /// Video id found locally in the link, if any. The server has the final
    /// say; this is only a pre-check.
    pub fn video_id(&self) -> Option<&str> {
        links::extract_video_id(self.url.trim())
    }
}

/// True when `url` ends in a query key with no value yet, so an `=` after it
/// belongs to the query (`...&feature=shorts`).
fn ends_in_query_key(url: &str) -> bool {
    match url.rfind(|c: char| c == '?' || c == '&') {
        Some(pos) => !url[pos + 1..].contains('='),
        None => false,
    }
}

impl FromStr for BatchItem {
    type Err = String;

    /// `URL` or `URL=CATEGORY`. A trailing `=...` that is not a category
    /// label, or that is the value of a query parameter, stays part of the
    /// URL (`watch?v=...`, `&feature=shorts`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty url".to_string());
        }
        if let Some((url, label)) = s.rsplit_once('=') {
            if let Some(category) = Category::parse(label).filter(|_| !ends_in_query_key(url)) {
                if url.trim().is_empty() {
                    return Err(format!("missing url before '={}'", label));
                }
                return Ok(BatchItem::new(url.trim()).with_category(category));
            }
        }
        Ok(BatchItem::new(s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// 1-based position in the batch.
    pub index: usize,
    pub total: usize,
    pub url: String,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "processing {} of {}: {}", self.index, self.total, self.url)
    }
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: &Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn report(&self, progress: &Progress) {
        self(progress)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: &Progress) {}
}

/// Forwards progress until the owning view goes away.
pub struct Detachable<S> {
    inner: S,
    attached: AtomicBool,
}

impl<S: ProgressSink> Detachable<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            attached: AtomicBool::new(true),
        }
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

impl<S: ProgressSink> ProgressSink for Detachable<S> {
    fn report(&self, progress: &Progress) {
        if self.is_attached() {
            self.inner.report(progress);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportResult {
    pub url: String,
    pub video_id: Option<VideoId>,
    pub error: Option<ApiError>,
}

impl ImportResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_detail(&self) -> Option<String> {
        self.error.as_ref().map(ApiError::user_message)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub success: usize,
    pub failure: usize,
}

impl BatchTally {
    pub fn is_clean(&self) -> bool {
        self.failure == 0
    }
}

impl fmt::Display for BatchTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Finished! Added: {}, Failed: {}", self.success, self.failure)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub results: Vec<ImportResult>,
    pub tally: BatchTally,
}

impl BatchReport {
    /// Anything was added, so views of the collection are stale.
    pub fn needs_refresh(&self) -> bool {
        self.tally.success > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ImportResult> {
        self.results.iter().filter(|r| !r.succeeded())
    }
}

/// Operator input for a manual batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchForm {
    pub items: Vec<BatchItem>,
}

impl Default for BatchForm {
    fn default() -> Self {
        Self {
            items: vec![BatchItem::default()],
        }
    }
}

impl BatchForm {
    pub fn from_items(items: Vec<BatchItem>) -> Self {
        if items.is_empty() {
            return Self::default();
        }
        Self { items }
    }

    /// Items worth submitting, in input order.
    pub fn pending(&self) -> Vec<BatchItem> {
        self.items.iter().filter(|i| !i.is_blank()).cloned().collect()
    }

    /// Clear back to a single blank row once anything went in; keep the
    /// input for correction when nothing did.
    pub fn apply_report(&mut self, report: &BatchReport) {
        if report.tally.success > 0 {
            *self = Self::default();
        }
    }
}

/// Resolves and adds links to one collection, strictly one at a time.
pub struct BatchImporter {
    service: Arc<dyn CuraService>,
    collection_id: CollectionId,
}

impl BatchImporter {
    pub fn new(service: Arc<dyn CuraService>, collection_id: CollectionId) -> Self {
        Self {
            service,
            collection_id,
        }
    }

    #[instrument(skip_all, fields(collection_id = self.collection_id))]
    pub async fn run(&self, items: &[BatchItem], progress: &dyn ProgressSink) -> BatchReport {
        let items: Vec<&BatchItem> = items.iter().filter(|i| !i.is_blank()).collect();
        let total = items.len();
        let mut report = BatchReport::default();

        for (i, item) in items.into_iter().enumerate() {
            let url = item.url.trim();
            progress.report(&Progress {
                index: i + 1,
                total,
                url: url.to_string(),
            });

            let result = match self.import_one(url, item.category).await {
                Ok(video_id) => {
                    report.tally.success += 1;
                    ImportResult {
                        url: url.to_string(),
                        video_id: Some(video_id),
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(url, error = %err, "import item failed");
                    report.tally.failure += 1;
                    ImportResult {
                        url: url.to_string(),
                        video_id: None,
                        error: Some(err),
                    }
                }
            };
            report.results.push(result);
        }

        info!(
            success = report.tally.success,
            failure = report.tally.failure,
            "batch import finished"
        );
        report
    }

    async fn import_one(&self, url: &str, category: Option<Category>) -> Result<VideoId, ApiError> {
        let draft = self
            .service
            .resolve_video_from_url(url)
            .await?
            .with_category(category);
        let video = self.service.add_video(self.collection_id, &draft).await?;
        Ok(video.id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// The collection's configured channel link.
    #[default]
    Official,
    /// An operator-supplied channel URL.
    Custom,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImportState {
    #[default]
    Initial,
    Checking,
    Confirm {
        title: String,
        video_count: u64,
    },
    Importing,
    Success {
        message: String,
        imported_count: Option<u64>,
    },
    Error {
        message: String,
    },
}

impl ImportState {
    pub fn name(&self) -> &'static str {
        match self {
            ImportState::Initial => "initial",
            ImportState::Checking => "checking",
            ImportState::Confirm { .. } => "confirm",
            ImportState::Importing => "importing",
            ImportState::Success { .. } => "success",
            ImportState::Error { .. } => "error",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, ImportState::Checking | ImportState::Importing)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ImportState::Success { .. } | ImportState::Error { .. })
    }
}

/// Channel import: look up the channel, confirm, run the server-side import.
#[derive(Debug, Clone)]
pub struct ChannelImportFlow {
    collection_id: CollectionId,
    state: ImportState,
    mode: ImportMode,
    custom_channel_url: String,
    default_category: Option<Category>,
    limit: u32,
}

impl ChannelImportFlow {
    pub fn new(collection_id: CollectionId) -> Self {
        Self {
            collection_id,
            state: ImportState::Initial,
            mode: ImportMode::Official,
            custom_channel_url: String::new(),
            default_category: None,
            limit: DEFAULT_IMPORT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn collection_id(&self) -> CollectionId {
        self.collection_id
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    pub fn mode(&self) -> ImportMode {
        self.mode
    }

    pub fn custom_channel_url(&self) -> &str {
        &self.custom_channel_url
    }

    pub fn default_category(&self) -> Option<Category> {
        self.default_category
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn set_mode(&mut self, mode: ImportMode) {
        self.mode = mode;
    }

    pub fn set_custom_channel_url(&mut self, url: impl Into<String>) {
        self.custom_channel_url = url.into();
    }

    pub fn set_default_category(&mut self, category: Option<Category>) {
        self.default_category = category;
    }

    /// Heading for the current state.
    pub fn title(&self) -> &'static str {
        match self.state {
            ImportState::Initial => "Auto-Import",
            ImportState::Checking => "Checking Channel...",
            ImportState::Confirm { .. } => "Confirm Import",
            ImportState::Importing => "Importing Videos...",
            ImportState::Success { .. } => "Import Successful",
            ImportState::Error { .. } => "Import Failed",
        }
    }

    /// Operator-facing message for the current state.
    pub fn message(&self) -> String {
        match &self.state {
            ImportState::Initial => String::new(),
            ImportState::Checking => "Fetching channel information from YouTube...".to_string(),
            ImportState::Confirm { title, video_count } => format!(
                "Found channel \"{}\" with {} videos. Do you want to import all of them?",
                title, video_count
            ),
            ImportState::Importing => {
                "Fetching videos from YouTube... This may take a while.".to_string()
            }
            ImportState::Success { message, .. } => message.clone(),
            ImportState::Error { message } => message.clone(),
        }
    }

    /// Body sent to the import endpoint. Custom source fields only travel in
    /// custom mode.
    pub fn request(&self) -> ImportRequest {
        let custom = self.mode == ImportMode::Custom;
        let url = self.custom_channel_url.trim();
        ImportRequest {
            limit: self.limit,
            custom_channel_url: (custom && !url.is_empty()).then(|| url.to_string()),
            default_category: if custom { self.default_category } else { None },
        }
    }

    fn invalid(&self, action: &'static str) -> ImportError {
        ImportError::InvalidTransition {
            state: self.state.name(),
            action,
        }
    }

    pub fn begin_check(&mut self) -> Result<(), ImportError> {
        if self.state != ImportState::Initial {
            return Err(self.invalid("check channel"));
        }
        self.state = ImportState::Checking;
        Ok(())
    }

    pub fn finish_check(&mut self, result: Result<ChannelInfo, ApiError>) -> Result<(), ImportError> {
        if self.state != ImportState::Checking {
            return Err(self.invalid("finish channel check"));
        }
        self.state = match result {
            Ok(info) => ImportState::Confirm {
                title: info.title,
                video_count: info.video_count,
            },
            Err(err) => {
                warn!(collection_id = self.collection_id, error = %err, "channel lookup failed");
                ImportState::Error {
                    message: err.user_message(),
                }
            }
        };
        Ok(())
    }

    /// `initial → checking → confirm | error`.
    pub async fn check(&mut self, service: &dyn CuraService) -> Result<&ImportState, ImportError> {
        self.begin_check()?;
        let result = service.get_channel_info(self.collection_id).await;
        self.finish_check(result)?;
        Ok(&self.state)
    }

    pub fn begin_import(&mut self) -> Result<ImportRequest, ImportError> {
        if !matches!(self.state, ImportState::Confirm { .. }) {
            return Err(self.invalid("start import"));
        }
        self.state = ImportState::Importing;
        Ok(self.request())
    }

    pub fn finish_import(
        &mut self,
        result: Result<ImportSummary, ApiError>,
    ) -> Result<(), ImportError> {
        if self.state != ImportState::Importing {
            return Err(self.invalid("finish import"));
        }
        self.state = match result {
            Ok(summary) => ImportState::Success {
                message: summary.message,
                imported_count: summary.imported_count,
            },
            Err(err) => {
                warn!(collection_id = self.collection_id, error = %err, "channel import failed");
                ImportState::Error {
                    message: err.user_message(),
                }
            }
        };
        Ok(())
    }

    /// `confirm → importing → success | error`. On success the collection's
    /// feed, when given, is reset so the next view refetches.
    #[instrument(skip_all, fields(collection_id = self.collection_id))]
    pub async fn run(
        &mut self,
        service: &dyn CuraService,
        feed: Option<&FeedAggregator>,
    ) -> Result<&ImportState, ImportError> {
        let request = self.begin_import()?;
        info!(limit = request.limit, custom = request.custom_channel_url.is_some(), "starting channel import");
        let result = service.import_channel(self.collection_id, &request).await;
        self.finish_import(result)?;
        if matches!(self.state, ImportState::Success { .. }) {
            if let Some(feed) = feed {
                feed.reset();
            }
        }
        Ok(&self.state)
    }

    /// Dismiss the flow and clear every transient field.
    pub fn close(&mut self) -> Result<(), ImportError> {
        if self.state.is_busy() {
            return Err(self.invalid("close"));
        }
        let collection_id = self.collection_id;
        let limit = self.limit;
        *self = Self::new(collection_id).with_limit(limit);
        Ok(())
    }

    /// Point a closed flow at another collection.
    pub fn retarget(&mut self, collection_id: CollectionId) -> Result<(), ImportError> {
        if self.state != ImportState::Initial {
            return Err(self.invalid("switch collection"));
        }
        self.collection_id = collection_id;
        Ok(())
    }
}
