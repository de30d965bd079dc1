use std::time::Duration;

use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::sanitize_base_url;
use crate::credentials::CredentialStore;
use crate::error::{Result, RoadmapError};
use crate::models::{
    BulkCreated, Comment, CommentEdit, ItemQuery, ItemTemplate, ItemUpdate, LoginInput, NewComment,
    NewItem, Notification, NotificationPage, NotificationQuery, RegisterInput, RoadmapItem, User,
    VoteStatus, VoteToggle,
};

const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong";

/// Every backend operation the coordinator relies on.
///
/// Implementations block; callers run them off the coordinator thread.
pub trait RoadmapApi: Send + Sync {
    fn login(&self, email: &str, password: &str) -> Result<User>;
    fn register(&self, email: &str, username: &str, password: &str) -> Result<User>;
    fn get_profile(&self) -> Result<User>;
    /// Forgets the stored credential. No request is made.
    fn logout(&self);

    fn list_items(&self, query: &ItemQuery) -> Result<Vec<RoadmapItem>>;
    fn get_item(&self, item_id: &str) -> Result<RoadmapItem>;
    fn create_item(&self, input: &NewItem) -> Result<RoadmapItem>;
    fn update_item(&self, item_id: &str, update: &ItemUpdate) -> Result<RoadmapItem>;
    fn delete_item(&self, item_id: &str) -> Result<()>;

    fn toggle_vote(&self, item_id: &str) -> Result<VoteToggle>;
    fn get_vote_status(&self, item_id: &str) -> Result<VoteStatus>;
    fn get_vote_count(&self, item_id: &str) -> Result<i64>;

    fn list_comments(&self, item_id: &str) -> Result<Vec<Comment>>;
    fn create_comment(
        &self,
        item_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<Comment>;
    fn update_comment(&self, comment_id: &str, content: &str) -> Result<Comment>;
    fn delete_comment(&self, comment_id: &str) -> Result<()>;

    fn list_notifications(&self, query: &NotificationQuery) -> Result<NotificationPage>;
    fn get_unread_count(&self) -> Result<u32>;
    fn mark_read(&self, notification_id: &str) -> Result<Notification>;
    fn mark_all_read(&self) -> Result<u32>;
    fn delete_notification(&self, notification_id: &str) -> Result<()>;

    fn create_random_item(&self) -> Result<RoadmapItem>;
    fn create_bulk_random(&self, count: u32) -> Result<BulkCreated>;
    fn create_demo(&self) -> Result<BulkCreated>;
    fn list_templates(&self) -> Result<Vec<ItemTemplate>>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemsData {
    items: Vec<RoadmapItem>,
}

#[derive(Debug, Deserialize)]
struct ItemData {
    item: RoadmapItem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VoteCountData {
    vote_count: i64,
}

#[derive(Debug, Deserialize)]
struct CommentsData {
    comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
struct CommentData {
    comment: Comment,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnreadData {
    unread_count: u32,
}

#[derive(Debug, Deserialize)]
struct NotificationData {
    notification: Notification,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkedData {
    #[serde(default)]
    marked_count: u32,
}

#[derive(Debug, Deserialize)]
struct TemplatesData {
    templates: Vec<ItemTemplate>,
}

#[derive(Serialize)]
struct BulkRequest {
    count: u32,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
    credentials: CredentialStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: CredentialStore) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, credentials, Duration::from_secs(15))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: CredentialStore,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let base = sanitize_base_url(base_url.into())?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base,
            client,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    fn url(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|err| RoadmapError::validation(format!("invalid request path {path}: {err}")))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.credentials.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn get(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.authorized(self.client.get(self.url(path)?)))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.authorized(self.client.post(self.url(path)?)))
    }

    fn put(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.authorized(self.client.put(self.url(path)?)))
    }

    fn delete(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.authorized(self.client.delete(self.url(path)?)))
    }

    /// Sends the request, turning non-success statuses into `RequestFailed`.
    fn execute(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
        debug!("request failed with {status}: {message}");
        Err(RoadmapError::RequestFailed {
            status: status.as_u16(),
            message,
        })
    }

    /// Sends the request and unwraps the `{data, token?}` envelope.
    fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<Envelope<T>> {
        let body = self.execute(builder)?.bytes()?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// For endpoints whose success body we do not inspect.
    fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        self.execute(builder).map(|_| ())
    }

    fn authenticate<B: Serialize>(&self, path: &str, body: &B) -> Result<User> {
        let envelope: Envelope<User> = self.send(self.post(path)?.json(body))?;
        if let Some(token) = envelope.token.as_deref() {
            self.credentials.store(token)?;
        }
        Ok(envelope.data)
    }
}

impl RoadmapApi for ApiClient {
    fn login(&self, email: &str, password: &str) -> Result<User> {
        let body = LoginInput {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/auth/login", &body)
    }

    fn register(&self, email: &str, username: &str, password: &str) -> Result<User> {
        let body = RegisterInput {
            email: email.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        };
        self.authenticate("/auth/register", &body)
    }

    fn get_profile(&self) -> Result<User> {
        Ok(self.send::<User>(self.get("/auth/profile")?)?.data)
    }

    fn logout(&self) {
        self.credentials.clear();
    }

    fn list_items(&self, query: &ItemQuery) -> Result<Vec<RoadmapItem>> {
        let builder = self.get("/roadmap")?.query(&query.to_params());
        Ok(self.send::<ItemsData>(builder)?.data.items)
    }

    fn get_item(&self, item_id: &str) -> Result<RoadmapItem> {
        let builder = self.get(&format!("/roadmap/{item_id}"))?;
        Ok(self.send::<ItemData>(builder)?.data.item)
    }

    fn create_item(&self, input: &NewItem) -> Result<RoadmapItem> {
        let builder = self.post("/roadmap")?.json(input);
        Ok(self.send::<ItemData>(builder)?.data.item)
    }

    fn update_item(&self, item_id: &str, update: &ItemUpdate) -> Result<RoadmapItem> {
        let builder = self.put(&format!("/roadmap/{item_id}"))?.json(update);
        Ok(self.send::<ItemData>(builder)?.data.item)
    }

    fn delete_item(&self, item_id: &str) -> Result<()> {
        self.send_empty(self.delete(&format!("/roadmap/{item_id}"))?)
    }

    fn toggle_vote(&self, item_id: &str) -> Result<VoteToggle> {
        let builder = self.post(&format!("/votes/{item_id}/toggle"))?;
        Ok(self.send::<VoteToggle>(builder)?.data)
    }

    fn get_vote_status(&self, item_id: &str) -> Result<VoteStatus> {
        let builder = self.get(&format!("/votes/{item_id}/status"))?;
        Ok(self.send::<VoteStatus>(builder)?.data)
    }

    fn get_vote_count(&self, item_id: &str) -> Result<i64> {
        let builder = self.get(&format!("/votes/{item_id}/count"))?;
        Ok(self.send::<VoteCountData>(builder)?.data.vote_count)
    }

    fn list_comments(&self, item_id: &str) -> Result<Vec<Comment>> {
        let builder = self.get(&format!("/comments/item/{item_id}"))?;
        Ok(self.send::<CommentsData>(builder)?.data.comments)
    }

    fn create_comment(
        &self,
        item_id: &str,
        content: &str,
        parent_id: Option<&str>,
    ) -> Result<Comment> {
        let body = NewComment {
            content: content.to_string(),
            parent_id: parent_id.map(str::to_string),
        };
        let builder = self.post(&format!("/comments/item/{item_id}"))?.json(&body);
        Ok(self.send::<CommentData>(builder)?.data.comment)
    }

    fn update_comment(&self, comment_id: &str, content: &str) -> Result<Comment> {
        let body = CommentEdit {
            content: content.to_string(),
        };
        let builder = self.put(&format!("/comments/{comment_id}"))?.json(&body);
        Ok(self.send::<CommentData>(builder)?.data.comment)
    }

    fn delete_comment(&self, comment_id: &str) -> Result<()> {
        self.send_empty(self.delete(&format!("/comments/{comment_id}"))?)
    }

    fn list_notifications(&self, query: &NotificationQuery) -> Result<NotificationPage> {
        let builder = self.get("/notifications")?.query(&query.to_params());
        Ok(self.send::<NotificationPage>(builder)?.data)
    }

    fn get_unread_count(&self) -> Result<u32> {
        let builder = self.get("/notifications/unread-count")?;
        Ok(self.send::<UnreadData>(builder)?.data.unread_count)
    }

    fn mark_read(&self, notification_id: &str) -> Result<Notification> {
        let builder = self.put(&format!("/notifications/{notification_id}/read"))?;
        Ok(self.send::<NotificationData>(builder)?.data.notification)
    }

    fn mark_all_read(&self) -> Result<u32> {
        let builder = self.put("/notifications/mark-all-read")?;
        Ok(self.send::<MarkedData>(builder)?.data.marked_count)
    }

    fn delete_notification(&self, notification_id: &str) -> Result<()> {
        self.send_empty(self.delete(&format!("/notifications/{notification_id}"))?)
    }

    fn create_random_item(&self) -> Result<RoadmapItem> {
        let builder = self.post("/roadmap/admin/random")?;
        Ok(self.send::<ItemData>(builder)?.data.item)
    }

    fn create_bulk_random(&self, count: u32) -> Result<BulkCreated> {
        let builder = self
            .post("/roadmap/admin/bulk-random")?
            .json(&BulkRequest { count });
        Ok(self.send::<BulkCreated>(builder)?.data)
    }

    fn create_demo(&self) -> Result<BulkCreated> {
        Ok(self.send::<BulkCreated>(self.post("/roadmap/admin/demo")?)?.data)
    }

    fn list_templates(&self) -> Result<Vec<ItemTemplate>> {
        let builder = self.get("/roadmap/admin/templates")?;
        Ok(self.send::<TemplatesData>(builder)?.data.templates)
    }
}
