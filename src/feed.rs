//! Accumulates a collection's server-paginated videos into one ordered list.
//!
//! A short page (fewer items than requested) is the only end-of-data signal;
//! the server's `total` and `has_more` fields are not consulted.
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};

use crate::api::{ApiError, CuraService};
use crate::model::{CollectionId, Page, Video, VideoId};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page arrived; `added` excludes ids that were already present.
    Appended { fetched: usize, added: usize },
    /// Nothing left to fetch, or another fetch is already running.
    Skipped,
    /// The feed was reset while this fetch was pending; its page was dropped.
    Discarded,
}

#[derive(Debug)]
struct FeedState {
    items: Vec<Video>,
    seen: HashSet<VideoId>,
    next_offset: u32,
    has_more: bool,
    in_flight: bool,
    generation: u64,
}

impl FeedState {
    fn new(generation: u64) -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            next_offset: 0,
            has_more: true,
            in_flight: false,
            generation,
        }
    }
}

pub struct FeedAggregator {
    service: Arc<dyn CuraService>,
    collection_id: CollectionId,
    page_size: u32,
    state: Mutex<FeedState>,
}

impl std::fmt::Debug for FeedAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedAggregator")
            .field("collection_id", &self.collection_id)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

/// Owns the in-flight flag for one fetch. The flag survives `reset()` and is
/// cleared only here, when the fetch finishes or its future is dropped.
struct InFlight<'a> {
    state: &'a Mutex<FeedState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_flight = false;
    }
}

impl FeedAggregator {
    pub fn new(service: Arc<dyn CuraService>, collection_id: CollectionId) -> Self {
        Self::with_page_size(service, collection_id, DEFAULT_PAGE_SIZE)
    }

    /// `page_size` of zero is bumped to one.
    pub fn with_page_size(
        service: Arc<dyn CuraService>,
        collection_id: CollectionId,
        page_size: u32,
    ) -> Self {
        Self {
            service,
            collection_id,
            page_size: page_size.max(1),
            state: Mutex::new(FeedState::new(0)),
        }
    }

    fn state(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn collection_id(&self) -> CollectionId {
        self.collection_id
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn has_more(&self) -> bool {
        self.state().has_more
    }

    pub fn next_offset(&self) -> u32 {
        self.state().next_offset
    }

    pub fn is_fetching(&self) -> bool {
        self.state().in_flight
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    /// Snapshot of the accumulated videos in server order.
    pub fn items(&self) -> Vec<Video> {
        self.state().items.clone()
    }

    /// Borrow the accumulated videos without cloning them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[Video]) -> R) -> R {
        f(&self.state().items)
    }

    /// Request the next page and append it.
    ///
    /// Calls made while a fetch is pending are coalesced into that fetch and
    /// return [`FetchOutcome::Skipped`] without touching the network. On
    /// failure the accumulated state is left as it was and the call can be
    /// retried.
    #[instrument(skip_all, fields(collection_id = self.collection_id))]
    pub async fn fetch_next(&self) -> Result<FetchOutcome, ApiError> {
        let (offset, generation) = {
            let mut st = self.state();
            if !st.has_more || st.in_flight {
                debug!(has_more = st.has_more, in_flight = st.in_flight, "fetch skipped");
                return Ok(FetchOutcome::Skipped);
            }
            st.in_flight = true;
            (st.next_offset, st.generation)
        };
        let _guard = InFlight { state: &self.state };

        debug!(offset, limit = self.page_size, "fetching page");
        let result = self
            .service
            .list_videos(self.collection_id, offset, self.page_size)
            .await;
        self.apply(generation, result)
    }

    fn apply(&self, generation: u64, result: Result<Page, ApiError>) -> Result<FetchOutcome, ApiError> {
        let mut st = self.state();
        if st.generation != generation {
            debug!("feed reset while fetching; dropping page");
            return Ok(FetchOutcome::Discarded);
        }

        let page = match result {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, offset = st.next_offset, "page fetch failed");
                return Err(err);
            }
        };

        let fetched = page.videos.len();
        st.next_offset = st.next_offset.saturating_add(fetched as u32);
        st.has_more = fetched >= self.page_size as usize;

        let mut added = 0;
        for video in page.videos {
            if st.seen.insert(video.id) {
                st.items.push(video);
                added += 1;
            }
        }
        debug!(
            fetched,
            added,
            total = st.items.len(),
            has_more = st.has_more,
            "page merged"
        );
        Ok(FetchOutcome::Appended { fetched, added })
    }

    /// Forget everything and start again from offset zero. A fetch pending
    /// across the reset still counts as in flight, so calls made meanwhile
    /// are skipped; it completes as [`FetchOutcome::Discarded`].
    pub fn reset(&self) {
        let mut st = self.state();
        let generation = st.generation.wrapping_add(1);
        let in_flight = st.in_flight;
        *st = FeedState::new(generation);
        st.in_flight = in_flight;
        debug!(collection_id = self.collection_id, "feed reset");
    }

    /// Fetch pages until the feed reports no more data. Stops early if a
    /// concurrent fetch or reset interferes. Returns the item count.
    pub async fn fetch_all(&self) -> Result<usize, ApiError> {
        loop {
            match self.fetch_next().await? {
                FetchOutcome::Appended { .. } => {}
                FetchOutcome::Skipped | FetchOutcome::Discarded => break,
            }
        }
        Ok(self.len())
    }
}
