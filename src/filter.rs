use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::model::{Category, Tab, Video};

/// Videos visible under `tab`. ALL and INFO hand back the input slice itself.
pub fn filter(items: &[Video], tab: Tab) -> Cow<'_, [Video]> {
    match tab {
        Tab::All | Tab::Info => Cow::Borrowed(items),
        Tab::Category(category) => Cow::Owned(
            items
                .iter()
                .filter(|v| v.category == category)
                .cloned()
                .collect(),
        ),
    }
}

/// Per-category counts for tab badges; categories with no videos are absent.
pub fn count_by_category(items: &[Video]) -> BTreeMap<Category, usize> {
    let mut counts = BTreeMap::new();
    for video in items {
        *counts.entry(video.category).or_insert(0) += 1;
    }
    counts
}
