use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Planned,
    InProgress,
    Completed,
    OnHold,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    UiUx,
    Features,
    Platform,
    Security,
    Performance,
    Integration,
    Mobile,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Planned,
        Status::InProgress,
        Status::Completed,
        Status::OnHold,
        Status::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Planned => "PLANNED",
            Status::InProgress => "IN_PROGRESS",
            Status::Completed => "COMPLETED",
            Status::OnHold => "ON_HOLD",
            Status::Cancelled => "CANCELLED",
        }
    }
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::UiUx,
        Category::Features,
        Category::Platform,
        Category::Security,
        Category::Performance,
        Category::Integration,
        Category::Mobile,
        Category::Api,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::UiUx => "UI_UX",
            Category::Features => "FEATURES",
            Category::Platform => "PLATFORM",
            Category::Security => "SECURITY",
            Category::Performance => "PERFORMANCE",
            Category::Integration => "INTEGRATION",
            Category::Mobile => "MOBILE",
            Category::Api => "API",
        }
    }
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value `{}`", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! wire_enum_parse {
    ($ty:ty) => {
        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let wanted = raw.trim().to_ascii_uppercase();
                <$ty>::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.as_str() == wanted)
                    .ok_or_else(|| UnknownVariant(raw.to_string()))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum_parse!(Status);
wire_enum_parse!(Category);
wire_enum_parse!(Priority);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    #[serde(rename = "upvotes", alias = "upvoteCount", default)]
    pub upvote_count: i64,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_voted: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(rename = "userId")]
    pub author_id: String,
    #[serde(rename = "username")]
    pub author_name: String,
    pub content: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "replies", default)]
    pub children: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSender {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationItemRef {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationCommentRef {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: String,
    #[serde(default)]
    pub sender: Option<NotificationSender>,
    #[serde(default)]
    pub item: Option<NotificationItemRef>,
    #[serde(default)]
    pub comment: Option<NotificationCommentRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentEdit {
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Upvotes,
    CreatedAt,
    Title,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Upvotes => "upvotes",
            SortKey::CreatedAt => "createdAt",
            SortKey::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Listing criteria. `None` filters mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub status: Option<Status>,
    pub category: Option<Category>,
    pub search: String,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
}

impl ItemQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(status) = self.status {
            params.push(("status", status.as_str().to_string()));
        }
        if let Some(category) = self.category {
            params.push(("category", category.as_str().to_string()));
        }
        let search = self.search.trim();
        if !search.is_empty() {
            params.push(("search", search.to_string()));
        }
        params.push(("sortBy", self.sort_by.as_str().to_string()));
        params.push(("sortOrder", self.sort_order.as_str().to_string()));
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationQuery {
    pub is_read: Option<bool>,
    pub kind: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl NotificationQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(is_read) = self.is_read {
            params.push(("isRead", is_read.to_string()));
        }
        if let Some(kind) = &self.kind {
            params.push(("type", kind.clone()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteToggle {
    pub action: VoteAction,
    pub vote_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_voted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotificationPage {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCreated {
    #[serde(default)]
    pub items: Vec<RoadmapItem>,
    #[serde(default)]
    pub count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_reads_wire_names() {
        let raw = r#"{
            "id": "abc123",
            "title": "Dark mode",
            "description": "Themes",
            "status": "IN_PROGRESS",
            "category": "UI_UX",
            "priority": "HIGH",
            "upvotes": 10,
            "createdAt": "2024-01-01T00:00:00Z"
        }"#;
        let item: RoadmapItem = serde_json::from_str(raw).expect("parse item");
        assert_eq!(item.status, Status::InProgress);
        assert_eq!(item.category, Category::UiUx);
        assert_eq!(item.upvote_count, 10);
        assert_eq!(item.has_voted, None);
    }

    #[test]
    fn comment_reads_nested_replies() {
        let raw = r#"{
            "id": "A", "userId": "u1", "username": "alice", "content": "root",
            "createdAt": "t0",
            "replies": [{"id": "B", "userId": "u2", "username": "bob",
                         "content": "reply", "createdAt": "t1"}]
        }"#;
        let comment: Comment = serde_json::from_str(raw).expect("parse comment");
        assert_eq!(comment.children.len(), 1);
        assert!(comment.children[0].children.is_empty());
        assert_eq!(comment.children[0].author_name, "bob");
    }

    #[test]
    fn item_query_omits_all_and_blank_search() {
        let query = ItemQuery {
            search: "   ".into(),
            ..Default::default()
        };
        let params = query.to_params();
        assert_eq!(
            params,
            vec![
                ("sortBy", "upvotes".to_string()),
                ("sortOrder", "desc".to_string())
            ]
        );

        let query = ItemQuery {
            status: Some(Status::OnHold),
            category: Some(Category::Api),
            search: " sync ".into(),
            ..Default::default()
        };
        let params = query.to_params();
        assert!(params.contains(&("status", "ON_HOLD".to_string())));
        assert!(params.contains(&("category", "API".to_string())));
        assert!(params.contains(&("search", "sync".to_string())));
    }

    #[test]
    fn wire_enums_parse_case_insensitively() {
        assert_eq!("in_progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!("UI_UX".parse::<Category>(), Ok(Category::UiUx));
        assert!("urgent".parse::<Priority>().is_err());
    }
}
