//! Plain-text rendering of collections and feeds for the terminal.
use std::fmt::Write;

use crate::filter::{count_by_category, filter};
use crate::links;
use crate::model::{Category, Collection, Tab, Video};

/// How a tab's videos are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Full cards, one after another.
    Thread,
    /// Compact vertical cards for short-form clips.
    ShortsGrid,
    /// Collection details instead of videos.
    Info,
}

impl Layout {
    pub fn for_tab(tab: Tab) -> Self {
        match tab {
            Tab::Info => Layout::Info,
            Tab::Category(Category::Shorts) => Layout::ShortsGrid,
            _ => Layout::Thread,
        }
    }
}

/// Thousands separated by commas: `1234567` prints as `1,234,567`.
pub fn format_number(number: u64) -> String {
    let digits = number.to_string();
    let lead = match digits.len() % 3 {
        0 => 3,
        n => n,
    };
    let mut groups = vec![&digits[..lead]];
    groups.extend((lead..digits.len()).step_by(3).map(|at| &digits[at..at + 3]));
    groups.join(",")
}

pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours != 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

pub fn collection_line(collection: &Collection) -> String {
    format!(
        "#{:03}  {:<8} {} ({} videos)",
        collection.id,
        format!("[{}]", collection.kind.as_str()),
        collection.title,
        format_number(collection.video_count)
    )
}

pub fn header(collection: &Collection) -> String {
    let mut out = String::new();
    let badge = if collection.is_official() { " [OFFICIAL]" } else { "" };
    let _ = writeln!(out, "{}{}", collection.title, badge);
    if !collection.description.trim().is_empty() {
        let _ = writeln!(out, "{}", collection.description.trim());
    }
    if let Some(link) = collection.official_link.as_deref().filter(|l| !l.is_empty()) {
        let _ = writeln!(out, "channel: {}", link);
    }
    out
}

pub fn info_block(collection: &Collection, loaded: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "COLLECTION #{:03}", collection.id);
    let _ = writeln!(out, "type:    {}", collection.kind.as_str());
    let _ = writeln!(out, "videos:  {}", format_number(collection.video_count));
    let _ = writeln!(out, "loaded:  {}", format_number(loaded as u64));
    if let Some(created) = collection.created_at {
        let _ = writeln!(out, "created: {}", created.format("%Y-%m-%d"));
    }
    for (label, value) in [
        ("cover", &collection.cover_image_url),
        ("profile", &collection.profile_image_url),
        ("link", &collection.official_link),
    ] {
        if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
            let _ = writeln!(out, "{:<8} {}", format!("{}:", label), v);
        }
    }
    out
}

pub fn thread_card(video: &Video) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}  (id {})", video.category, video.title, video.id);
    let _ = writeln!(
        out,
        "    {} · {} · {}",
        video.channel_name,
        video.published_at.format("%Y-%m-%d"),
        format_duration(video.duration_seconds)
    );
    let _ = writeln!(out, "    {}", links::watch_url(&video.youtube_video_id));
    if let Some(comment) = video.comment.as_deref().filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(out, "    > {}", comment.trim());
    }
    out
}

pub fn shorts_card(video: &Video) -> String {
    format!(
        "▶ {}  {}\n",
        video.title,
        links::embed_url(&video.youtube_video_id)
    )
}

/// Tab bar with per-category counts of what is loaded so far.
pub fn tab_bar(items: &[Video], active: Tab) -> String {
    let counts = count_by_category(items);
    let mut tabs = vec![(Tab::All, Some(items.len()))];
    tabs.extend(
        Category::ALL
            .iter()
            .filter(|c| **c != Category::Etc)
            .map(|c| (Tab::Category(*c), Some(counts.get(c).copied().unwrap_or(0)))),
    );
    tabs.push((Tab::Info, None));

    tabs.iter()
        .map(|(tab, count)| {
            let label = match count {
                Some(n) => format!("{} {}", tab.label(), n),
                None => tab.label().to_string(),
            };
            if *tab == active {
                format!("[{}]", label)
            } else {
                label
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

/// Everything shown below the header for `tab`.
pub fn render_tab(collection: &Collection, items: &[Video], tab: Tab) -> String {
    let mut out = String::new();
    match Layout::for_tab(tab) {
        Layout::Info => {
            out.push_str(&info_block(collection, items.len()));
        }
        Layout::ShortsGrid => {
            let visible = filter(items, tab);
            if visible.is_empty() {
                out.push_str("No Shorts found in this collection.\n");
            }
            for video in visible.iter() {
                out.push_str(&shorts_card(video));
            }
        }
        Layout::Thread => {
            let heading = match tab {
                Tab::All => "LATEST DROPS",
                other => other.label(),
            };
            let _ = writeln!(out, "{}  COLLECTION #{:03}", heading, collection.id);
            let visible = filter(items, tab);
            if visible.is_empty() {
                out.push_str("No videos found in this category.\n");
            }
            for video in visible.iter() {
                out.push_str(&thread_card(video));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CollectionType;
    use chrono::{TimeZone, Utc};

    fn collection() -> Collection {
        Collection {
            id: 7,
            title: "Artist".into(),
            description: "All the clips".into(),
            kind: CollectionType::Official,
            cover_image_url: None,
            profile_image_url: None,
            official_link: Some("https://www.youtube.com/@artist".into()),
            created_at: None,
            video_count: 1234,
        }
    }

    fn video(id: i64, category: Category) -> Video {
        Video {
            id,
            collection_id: Some(7),
            youtube_video_id: "dQw4w9WgXcQ".into(),
            title: format!("clip {}", id),
            channel_name: "Artist".into(),
            thumbnail_url: String::new(),
            description: None,
            comment: Some("must watch".into()),
            category,
            duration_seconds: 212,
            published_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn number_and_duration_formatting() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(123456), "123,456");
        assert_eq!(format_duration(212), "3:32");
        assert_eq!(format_duration(3725), "1:02:05");
    }

    #[test]
    fn layout_routing() {
        assert_eq!(Layout::for_tab(Tab::All), Layout::Thread);
        assert_eq!(Layout::for_tab(Tab::Info), Layout::Info);
        assert_eq!(Layout::for_tab(Tab::Category(Category::Shorts)), Layout::ShortsGrid);
        assert_eq!(Layout::for_tab(Tab::Category(Category::Mv)), Layout::Thread);
    }

    #[test]
    fn collection_line_shows_badge_and_count() {
        assert_eq!(
            collection_line(&collection()),
            "#007  [OFFICIAL] Artist (1,234 videos)"
        );
    }

    #[test]
    fn thread_render_filters_by_tab() {
        let items = vec![video(1, Category::Mv), video(2, Category::Live)];
        let out = render_tab(&collection(), &items, Tab::Category(Category::Live));
        assert!(out.starts_with("LIVE  COLLECTION #007"));
        assert!(out.contains("clip 2"));
        assert!(!out.contains("clip 1"));
        assert!(out.contains("> must watch"));
    }

    #[test]
    fn empty_states() {
        let items = vec![video(1, Category::Mv)];
        assert!(render_tab(&collection(), &items, Tab::Category(Category::Shorts))
            .contains("No Shorts found"));
        assert!(render_tab(&collection(), &items, Tab::Category(Category::Vlog))
            .contains("No videos found in this category."));
    }

    #[test]
    fn info_tab_shows_details() {
        let out = render_tab(&collection(), &[video(1, Category::Mv)], Tab::Info);
        assert!(out.contains("COLLECTION #007"));
        assert!(out.contains("loaded:  1"));
        assert!(out.contains("link:    https://www.youtube.com/@artist"));
    }

    #[test]
    fn tab_bar_marks_active() {
        let items = vec![video(1, Category::Mv), video(2, Category::Mv)];
        let bar = tab_bar(&items, Tab::Category(Category::Mv));
        assert!(bar.starts_with("ALL 2"));
        assert!(bar.contains("[MV 2]"));
        assert!(bar.ends_with("INFO"));
    }
}
