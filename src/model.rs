use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

const PLACEHOLDER_PREFIX: &str = "local:";
const PLACEHOLDER_LOGO: &str = "https://via.placeholder.com/100";
const PLACEHOLDER_NEWS_IMAGE: &str = "https://via.placeholder.com/400x200";
const PLACEHOLDER_TEMPLATE_IMAGE: &str = "https://via.placeholder.com/400x300";

static REMOTE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid identifier pattern"));

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    News,
    ChannelResource,
    Template,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Project,
        EntityKind::News,
        EntityKind::ChannelResource,
        EntityKind::Template,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::News => "news",
            EntityKind::ChannelResource => "channel_resource",
            EntityKind::Template => "template",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Project => "projects",
            EntityKind::News => "news",
            EntityKind::ChannelResource => "channel_resources",
            EntityKind::Template => "landing_page_templates",
        }
    }

    /// Storage subfolder for uploaded images; `None` for kinds without an image.
    pub fn image_folder(&self) -> Option<&'static str> {
        match self {
            EntityKind::Project => Some("projects"),
            EntityKind::News => Some("news"),
            EntityKind::Template => Some("templates"),
            EntityKind::ChannelResource => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "project" | "projects" => Some(EntityKind::Project),
            "news" => Some(EntityKind::News),
            "channel" | "channel_resource" | "channel_resources" => {
                Some(EntityKind::ChannelResource)
            }
            "template" | "templates" | "landing_page_templates" => Some(EntityKind::Template),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Opaque record identifier. Server-issued values are slugs or UUIDs;
/// client placeholders carry the `local:` prefix and never pass `is_remote`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn placeholder() -> Self {
        Self(format!("{}{}", PLACEHOLDER_PREFIX, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(PLACEHOLDER_PREFIX)
    }

    pub fn is_remote(&self) -> bool {
        REMOTE_ID.is_match(&self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A persisted row: identifier, server timestamps, and the entity columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<F> {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: F,
}

impl<F> Record<F> {
    pub fn new(id: impl Into<String>, fields: F) -> Self {
        Self {
            id: RecordId::new(id),
            created_at: None,
            updated_at: None,
            fields,
        }
    }
}

pub type Project = Record<ProjectFields>;
pub type NewsItem = Record<NewsFields>;
pub type ChannelResource = Record<ChannelResourceFields>;
pub type LandingPageTemplate = Record<TemplateFields>;

/// Per-entity behaviour the generic repository and session rely on.
pub trait Content:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;

    /// Names of required columns that are blank.
    fn missing_fields(&self) -> Vec<&'static str>;

    /// Column and direction (`true` = descending) the store sorts by.
    fn order_column() -> (&'static str, bool);

    /// Client-side listing order; callers use a stable sort so ties keep
    /// insertion order.
    fn listing_order(a: &Record<Self>, b: &Record<Self>) -> Ordering;

    /// Defaults for an "add new" form, given the current working collection.
    fn blank(existing: &[Record<Self>]) -> Self;

    fn label(&self) -> &str;

    fn image_url_mut(&mut self) -> Option<&mut String> {
        None
    }
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn newest_first<F>(a: &Record<F>, b: &Record<F>) -> Ordering {
    b.created_at.cmp(&a.created_at)
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFields {
    pub name: String,
    pub logo_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub strengths: Vec<String>,
    pub register_link: String,
    pub group_link: String,
    pub contact_phone: String,
    pub short_description: String,
    pub popup_content: String,
    pub priority: i32,
    pub enabled: bool,
    pub commission_policy: Option<String>,
    pub conditions: Option<String>,
    pub tab_1_title: Option<String>,
    pub tab_1_content: Option<String>,
    pub tab_2_title: Option<String>,
    pub tab_2_content: Option<String>,
    pub tab_3_title: Option<String>,
    pub tab_3_content: Option<String>,
}

impl ProjectFields {
    /// Cards show at most this many strengths; storage is unbounded.
    pub const DISPLAYED_STRENGTHS: usize = 3;

    pub fn displayed_strengths(&self) -> &[String] {
        let n = self.strengths.len().min(Self::DISPLAYED_STRENGTHS);
        &self.strengths[..n]
    }

    pub fn add_strength(&mut self) {
        self.strengths.push(String::new());
    }

    pub fn set_strength(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.strengths.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    pub fn remove_strength(&mut self, index: usize) -> Option<String> {
        (index < self.strengths.len()).then(|| self.strengths.remove(index))
    }

    /// Detail tabs that have a title, in order.
    pub fn tabs(&self) -> Vec<(&str, &str)> {
        [
            (&self.tab_1_title, &self.tab_1_content),
            (&self.tab_2_title, &self.tab_2_content),
            (&self.tab_3_title, &self.tab_3_content),
        ]
        .into_iter()
        .filter_map(|(title, content)| {
            let title = title.as_deref().filter(|t| !blank(t))?;
            Some((title, content.as_deref().unwrap_or("")))
        })
        .collect()
    }
}

impl Content for ProjectFields {
    const KIND: EntityKind = EntityKind::Project;

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if blank(&self.name) {
            missing.push("name");
        }
        if blank(&self.logo_url) {
            missing.push("logo_url");
        }
        missing
    }

    fn order_column() -> (&'static str, bool) {
        ("priority", false)
    }

    /// Ascending priority; ties go to the earlier insert. Rows without a
    /// timestamp (seed content) sort ahead of stored ones.
    fn listing_order(a: &Record<Self>, b: &Record<Self>) -> Ordering {
        a.fields
            .priority
            .cmp(&b.fields.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
    }

    fn blank(existing: &[Record<Self>]) -> Self {
        Self {
            logo_url: PLACEHOLDER_LOGO.to_string(),
            strengths: vec![String::new(); 3],
            priority: existing.len() as i32 + 1,
            enabled: false,
            ..Default::default()
        }
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn image_url_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.logo_url)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum NewsCategory {
    #[default]
    News,
    Knowledge,
    Policy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsFields {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub content: Option<String>,
    pub date: NaiveDate,
    pub category: NewsCategory,
    pub image_url: String,
}

impl Content for NewsFields {
    const KIND: EntityKind = EntityKind::News;

    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("summary", &self.summary),
            ("image_url", &self.image_url),
        ]
        .into_iter()
        .filter(|(_, v)| blank(v))
        .map(|(name, _)| name)
        .collect()
    }

    fn order_column() -> (&'static str, bool) {
        ("date", true)
    }

    fn listing_order(a: &Record<Self>, b: &Record<Self>) -> Ordering {
        b.fields.date.cmp(&a.fields.date)
    }

    fn blank(_existing: &[Record<Self>]) -> Self {
        Self {
            title: String::new(),
            summary: String::new(),
            content: Some(String::new()),
            date: Utc::now().date_naive(),
            category: NewsCategory::News,
            image_url: PLACEHOLDER_NEWS_IMAGE.to_string(),
        }
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn image_url_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.image_url)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceType {
    #[default]
    Guide,
    Resource,
    Script,
}

/// Glyph selector for a channel resource card. The column is free text, so
/// names outside the known set are carried through unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum IconName {
    Users,
    FileText,
    Share2,
    Video,
    Image,
    Other(String),
}

impl IconName {
    pub fn as_str(&self) -> &str {
        match self {
            IconName::Users => "Users",
            IconName::FileText => "FileText",
            IconName::Share2 => "Share2",
            IconName::Video => "Video",
            IconName::Image => "Image",
            IconName::Other(name) => name,
        }
    }
}

impl From<String> for IconName {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Users" => IconName::Users,
            "FileText" => IconName::FileText,
            "Share2" => IconName::Share2,
            "Video" => IconName::Video,
            "Image" => IconName::Image,
            _ => IconName::Other(name),
        }
    }
}

impl From<IconName> for String {
    fn from(icon: IconName) -> Self {
        match icon {
            IconName::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResourceFields {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub icon_name: Option<IconName>,
}

impl Content for ChannelResourceFields {
    const KIND: EntityKind = EntityKind::ChannelResource;

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if blank(&self.title) {
            missing.push("title");
        }
        if blank(&self.description) {
            missing.push("description");
        }
        missing
    }

    fn order_column() -> (&'static str, bool) {
        ("created_at", true)
    }

    fn listing_order(a: &Record<Self>, b: &Record<Self>) -> Ordering {
        newest_first(a, b)
    }

    fn blank(_existing: &[Record<Self>]) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            kind: ResourceType::Guide,
            link_url: None,
            content: None,
            icon_name: Some(IconName::FileText),
        }
    }

    fn label(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TemplateCategory {
    #[default]
    Finance,
    Insurance,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFields {
    pub title: String,
    pub description: String,
    pub image_url: String,
    #[serde(default)]
    pub demo_url: Option<String>,
    pub category: TemplateCategory,
}

impl Content for TemplateFields {
    const KIND: EntityKind = EntityKind::Template;

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if blank(&self.title) {
            missing.push("title");
        }
        if blank(&self.image_url) {
            missing.push("image_url");
        }
        missing
    }

    fn order_column() -> (&'static str, bool) {
        ("created_at", true)
    }

    fn listing_order(a: &Record<Self>, b: &Record<Self>) -> Ordering {
        newest_first(a, b)
    }

    fn blank(_existing: &[Record<Self>]) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            image_url: PLACEHOLDER_TEMPLATE_IMAGE.to_string(),
            demo_url: Some("#".to_string()),
            category: TemplateCategory::Finance,
        }
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn image_url_mut(&mut self) -> Option<&mut String> {
        Some(&mut self.image_url)
    }
}

/// The record open in the edit form. New drafts carry a placeholder key for
/// list rendering only; it is never sent to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Draft<F> {
    New { key: RecordId, fields: F },
    Existing { id: RecordId, fields: F },
}

impl<F: Content> Draft<F> {
    pub fn new(existing: &[Record<F>]) -> Self {
        Draft::New {
            key: RecordId::placeholder(),
            fields: F::blank(existing),
        }
    }

    pub fn with_fields(fields: F) -> Self {
        Draft::New {
            key: RecordId::placeholder(),
            fields,
        }
    }

    pub fn edit(record: &Record<F>) -> Self {
        Draft::Existing {
            id: record.id.clone(),
            fields: record.fields.clone(),
        }
    }

    pub fn key(&self) -> &RecordId {
        match self {
            Draft::New { key, .. } => key,
            Draft::Existing { id, .. } => id,
        }
    }

    pub fn fields(&self) -> &F {
        match self {
            Draft::New { fields, .. } | Draft::Existing { fields, .. } => fields,
        }
    }

    pub fn fields_mut(&mut self) -> &mut F {
        match self {
            Draft::New { fields, .. } | Draft::Existing { fields, .. } => fields,
        }
    }
}
