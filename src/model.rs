use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub type CollectionId = i64;
pub type VideoId = i64;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE", from = "Option<String>")]
pub enum Category {
    Mv,
    Live,
    Fancam,
    Interview,
    Shorts,
    Behind,
    Vlog,
    #[default]
    Etc,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Mv,
        Category::Live,
        Category::Fancam,
        Category::Interview,
        Category::Shorts,
        Category::Behind,
        Category::Vlog,
        Category::Etc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Mv => "MV",
            Category::Live => "LIVE",
            Category::Fancam => "FANCAM",
            Category::Interview => "INTERVIEW",
            Category::Shorts => "SHORTS",
            Category::Behind => "BEHIND",
            Category::Vlog => "VLOG",
            Category::Etc => "ETC",
        }
    }

    /// Strict lookup by label, case-insensitive.
    pub fn parse(label: &str) -> Option<Category> {
        let label = label.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(label))
    }
}

impl From<Option<String>> for Category {
    /// Lenient decoding: anything the enumeration does not know becomes ETC.
    fn from(value: Option<String>) -> Self {
        value
            .as_deref()
            .and_then(Category::parse)
            .unwrap_or_default()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::parse(s).ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// Feed tab selection: everything, the info panel, or one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tab {
    #[default]
    All,
    Info,
    Category(Category),
}

impl Tab {
    pub fn label(&self) -> &'static str {
        match self {
            Tab::All => "ALL",
            Tab::Info => "INFO",
            Tab::Category(c) => c.as_str(),
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("ALL") {
            Ok(Tab::All)
        } else if s.eq_ignore_ascii_case("INFO") {
            Ok(Tab::Info)
        } else {
            Category::parse(s)
                .map(Tab::Category)
                .ok_or_else(|| format!("unknown tab '{}'", s))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CollectionType {
    Official,
    #[default]
    User,
}

impl CollectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionType::Official => "OFFICIAL",
            CollectionType::User => "USER",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub id: VideoId,
    #[serde(default)]
    pub collection_id: Option<CollectionId>,
    pub youtube_video_id: String,
    pub title: String,
    pub channel_name: String,
    pub thumbnail_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub duration_seconds: i64,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub published_at: DateTime<Utc>,
}

/// Importable fields produced by resolving an external video link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoDraft {
    pub youtube_video_id: String,
    pub title: String,
    pub channel_name: String,
    pub thumbnail_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<DateTime<Utc>>,
}

impl VideoDraft {
    /// Operator-chosen category wins over whatever the resolver suggested.
    pub fn with_category(mut self, category: Option<Category>) -> Self {
        if category.is_some() {
            self.category = category;
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
}

impl VideoPatch {
    pub fn is_empty(&self) -> bool {
        *self == VideoPatch::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    pub id: CollectionId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: CollectionType,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub official_link: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub video_count: u64,
}

impl Collection {
    pub fn is_official(&self) -> bool {
        self.kind == CollectionType::Official
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CollectionDraft {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: CollectionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub official_link: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CollectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub official_link: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<CollectionType>,
}

impl CollectionPatch {
    pub fn is_empty(&self) -> bool {
        *self == CollectionPatch::default()
    }
}

/// One server slice of a collection's videos.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub videos: Vec<Video>,
    pub skip: u32,
    pub limit: u32,
    pub total: Option<u64>,
    pub has_more: Option<bool>,
}

/// Wire shapes accepted for `collections/{id}/videos`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PageBody {
    Paged {
        videos: Vec<Video>,
        #[serde(default)]
        total: Option<u64>,
        #[serde(default)]
        skip: Option<u32>,
        #[serde(default)]
        limit: Option<u32>,
        #[serde(default)]
        has_more: Option<bool>,
    },
    Bare(Vec<Video>),
}

impl PageBody {
    /// Fill in request-side paging where the bare shape carries none.
    pub fn into_page(self, skip: u32, limit: u32) -> Page {
        match self {
            PageBody::Bare(videos) => Page {
                videos,
                skip,
                limit,
                total: None,
                has_more: None,
            },
            PageBody::Paged {
                videos,
                total,
                skip: s,
                limit: l,
                has_more,
            } => Page {
                videos,
                skip: s.unwrap_or(skip),
                limit: l.unwrap_or(limit),
                total,
                has_more,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelInfo {
    pub title: String,
    #[serde(default)]
    pub video_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportRequest {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_channel_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_category: Option<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub message: String,
    #[serde(default)]
    pub imported_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

/// The service emits naive UTC datetimes; accept those as well as RFC 3339.
mod timestamp {
    use super::*;
    use serde::de::Error;

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn video_json(id: i64, category: serde_json::Value) -> serde_json::Value {
        json!({
            "id": id,
            "collection_id": 1,
            "youtube_video_id": "dQw4w9WgXcQ",
            "title": "title",
            "channel_name": "channel",
            "thumbnail_url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg",
            "category": category,
            "duration_seconds": 212,
            "published_at": "2024-03-01T12:30:00"
        })
    }

    #[test]
    fn category_decodes_known_values() {
        let v: Video = serde_json::from_value(video_json(1, json!("FANCAM"))).unwrap();
        assert_eq!(v.category, Category::Fancam);
        assert_eq!(
            v.published_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn unknown_null_or_missing_category_is_etc() {
        let v: Video = serde_json::from_value(video_json(1, json!("TEASER"))).unwrap();
        assert_eq!(v.category, Category::Etc);

        let v: Video = serde_json::from_value(video_json(1, json!(null))).unwrap();
        assert_eq!(v.category, Category::Etc);

        let mut raw = video_json(1, json!("MV"));
        raw.as_object_mut().unwrap().remove("category");
        let v: Video = serde_json::from_value(raw).unwrap();
        assert_eq!(v.category, Category::Etc);
    }

    #[test]
    fn category_serializes_uppercase() {
        assert_eq!(serde_json::to_value(Category::Interview).unwrap(), json!("INTERVIEW"));
        assert_eq!(serde_json::to_value(Category::Mv).unwrap(), json!("MV"));
    }

    #[test]
    fn rfc3339_timestamps_are_accepted() {
        let mut raw = video_json(1, json!("MV"));
        raw["published_at"] = json!("2024-03-01T12:30:00Z");
        let v: Video = serde_json::from_value(raw).unwrap();
        assert_eq!(
            v.published_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn tab_parses_labels() {
        assert_eq!("all".parse::<Tab>().unwrap(), Tab::All);
        assert_eq!("INFO".parse::<Tab>().unwrap(), Tab::Info);
        assert_eq!("shorts".parse::<Tab>().unwrap(), Tab::Category(Category::Shorts));
        assert!("nope".parse::<Tab>().is_err());
    }

    #[test]
    fn page_body_accepts_bare_array() {
        let body: PageBody = serde_json::from_value(json!([video_json(1, json!("MV"))])).unwrap();
        let page = body.into_page(40, 20);
        assert_eq!(page.videos.len(), 1);
        assert_eq!(page.skip, 40);
        assert_eq!(page.limit, 20);
        assert_eq!(page.total, None);
    }

    #[test]
    fn page_body_accepts_paged_object() {
        let body: PageBody = serde_json::from_value(json!({
            "videos": [video_json(1, json!("MV")), video_json(2, json!("LIVE"))],
            "total": 45,
            "skip": 0,
            "limit": 20,
            "has_more": true
        }))
        .unwrap();
        let page = body.into_page(0, 20);
        assert_eq!(page.videos.len(), 2);
        assert_eq!(page.total, Some(45));
        assert_eq!(page.has_more, Some(true));
    }

    #[test]
    fn draft_category_override() {
        let draft = VideoDraft {
            category: Some(Category::Mv),
            ..Default::default()
        };
        assert_eq!(draft.clone().with_category(None).category, Some(Category::Mv));
        assert_eq!(
            draft.with_category(Some(Category::Live)).category,
            Some(Category::Live)
        );
    }

    #[test]
    fn import_request_omits_unset_options() {
        let req = ImportRequest {
            limit: 5000,
            custom_channel_url: None,
            default_category: None,
        };
        assert_eq!(serde_json::to_value(&req).unwrap(), json!({ "limit": 5000 }));

        let req = ImportRequest {
            limit: 10,
            custom_channel_url: Some("https://www.youtube.com/@artist".into()),
            default_category: Some(Category::Vlog),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "limit": 10,
                "custom_channel_url": "https://www.youtube.com/@artist",
                "default_category": "VLOG"
            })
        );
    }

    #[test]
    fn collection_type_field_is_renamed() {
        let c: Collection = serde_json::from_value(json!({
            "id": 3,
            "title": "Artist",
            "description": "d",
            "type": "OFFICIAL",
            "cover_image_url": null,
            "profile_image_url": null,
            "official_link": "https://www.youtube.com/@artist",
            "created_at": "2024-01-05T09:00:00.123456",
            "video_count": 12
        }))
        .unwrap();
        assert!(c.is_official());
        assert_eq!(c.video_count, 12);
        assert!(c.created_at.is_some());
    }

    #[test]
    fn empty_patch_serializes_to_empty_object() {
        assert!(VideoPatch::default().is_empty());
        assert_eq!(serde_json::to_value(VideoPatch::default()).unwrap(), json!({}));
    }
}
