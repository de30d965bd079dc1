use chrono::Utc;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use uuid::Uuid;

use crate::comment_tree::{self, MAX_COMMENT_LEN, MAX_REPLY_DEPTH};
use crate::error::{Result, RoadmapError};
use crate::models::{Category, Comment, ItemUpdate, NewItem, SortKey, SortOrder, Status};

use super::state::{AuthState, PanelState, PendingComment, PendingVote, SeedKind};
use super::tasks;
use super::{RoadmapApp, DEMO_ITEM_COUNT, MAX_BULK_ITEMS};

lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles");
}

impl RoadmapApp {
    // ---- session ----

    /// Re-establishes a session from a stored credential, if there is one.
    pub fn restore_session(&mut self) {
        if self.auth != AuthState::Unauthenticated {
            debug!("restore_session ignored in state {:?}", self.auth);
            return;
        }
        if self.credentials.token().is_none() {
            debug!("no stored credential to restore");
            return;
        }
        self.auth = AuthState::Authenticating;
        tasks::load_profile(self.api.clone(), self.tx.clone());
    }

    pub fn login(&mut self, email: &str, password: &str) {
        if self.auth == AuthState::Authenticating {
            return;
        }
        let email = email.trim();
        if let Err(err) = validate_credentials(email, password) {
            self.notify_error("Login failed", err.user_message());
            return;
        }
        if self.session.is_some() {
            self.end_session();
        }
        self.auth = AuthState::Authenticating;
        tasks::login(
            self.api.clone(),
            self.tx.clone(),
            email.to_string(),
            password.to_string(),
        );
    }

    pub fn register(&mut self, email: &str, username: &str, password: &str) {
        if self.auth == AuthState::Authenticating {
            return;
        }
        let email = email.trim();
        let username = username.trim();
        let checked = validate_credentials(email, password).and_then(|()| {
            if username.is_empty() {
                Err(RoadmapError::validation("Username is required"))
            } else {
                Ok(())
            }
        });
        if let Err(err) = checked {
            self.notify_error("Registration failed", err.user_message());
            return;
        }
        if self.session.is_some() {
            self.end_session();
        }
        self.auth = AuthState::Authenticating;
        tasks::register(
            self.api.clone(),
            self.tx.clone(),
            email.to_string(),
            username.to_string(),
            password.to_string(),
        );
    }

    pub fn logout(&mut self) {
        if self.session.is_none() && self.auth == AuthState::Unauthenticated {
            return;
        }
        self.api.logout();
        self.end_session();
        self.notify("Logged out", "You have been successfully logged out.");
    }

    // ---- item list ----

    /// Requests the list for the current filters. Responses to earlier
    /// requests are discarded when they arrive.
    pub fn refresh_items(&mut self) {
        self.items_generation += 1;
        self.items_loading = true;
        self.items_error = None;
        tasks::load_items(
            self.api.clone(),
            self.tx.clone(),
            self.items_generation,
            self.query.clone(),
        );
    }

    pub fn set_status_filter(&mut self, status: Option<Status>) {
        if self.query.status != status {
            self.query.status = status;
            self.refresh_items();
        }
    }

    pub fn set_category_filter(&mut self, category: Option<Category>) {
        if self.query.category != category {
            self.query.category = category;
            self.refresh_items();
        }
    }

    pub fn set_sort(&mut self, sort_by: SortKey, sort_order: SortOrder) {
        if self.query.sort_by != sort_by || self.query.sort_order != sort_order {
            self.query.sort_by = sort_by;
            self.query.sort_order = sort_order;
            self.refresh_items();
        }
    }

    pub fn set_search(&mut self, search: &str) {
        if self.query.search != search {
            self.query.search = search.to_string();
            self.refresh_items();
        }
    }

    pub fn clear_filters(&mut self) {
        let cleared = crate::models::ItemQuery {
            sort_by: self.query.sort_by,
            sort_order: self.query.sort_order,
            ..Default::default()
        };
        if self.query != cleared {
            self.query = cleared;
            self.refresh_items();
        }
    }

    pub fn create_item(&mut self, input: NewItem) {
        if !self.require_session("create items") {
            return;
        }
        let title = input.title.trim();
        let description = input.description.trim();
        if title.is_empty() || description.is_empty() {
            self.notify_error("Invalid item", "Title and description are required.");
            return;
        }
        let input = NewItem {
            title: title.to_string(),
            description: description.to_string(),
            ..input
        };
        tasks::create_item(self.api.clone(), self.tx.clone(), input);
    }

    pub fn create_random_item(&mut self) {
        if !self.require_session("create items") {
            return;
        }
        tasks::create_random_item(self.api.clone(), self.tx.clone());
    }

    /// Asks the server for `count` random items (at most
    /// [`MAX_BULK_ITEMS`]). One seeding request runs at a time.
    pub fn create_bulk_random_items(&mut self, count: u32) {
        if !self.require_session("create items") {
            return;
        }
        if count == 0 {
            self.notify_error("Invalid count", "Choose at least one item to create.");
            return;
        }
        self.seed(SeedKind::Bulk, count.min(MAX_BULK_ITEMS));
    }

    pub fn create_demo_items(&mut self) {
        if !self.require_session("create items") {
            return;
        }
        self.seed(SeedKind::Demo, DEMO_ITEM_COUNT);
    }

    fn seed(&mut self, kind: SeedKind, requested: u32) {
        if self.seeding {
            debug!("{kind:?} seeding ignored: another one is running");
            return;
        }
        self.seeding = true;
        tasks::seed_items(self.api.clone(), self.tx.clone(), kind, requested);
    }

    pub fn load_templates(&mut self) {
        tasks::load_templates(self.api.clone(), self.tx.clone());
    }

    pub fn update_item(&mut self, item_id: &str, update: ItemUpdate) {
        if !self.require_session("edit items") {
            return;
        }
        let blank = |field: &Option<String>| field.as_deref().is_some_and(|v| v.trim().is_empty());
        if blank(&update.title) || blank(&update.description) {
            self.notify_error("Invalid item", "Title and description cannot be empty.");
            return;
        }
        tasks::update_item(self.api.clone(), self.tx.clone(), item_id.to_string(), update);
    }

    pub fn delete_item(&mut self, item_id: &str) {
        if !self.require_session("delete items") {
            return;
        }
        tasks::delete_item(self.api.clone(), self.tx.clone(), item_id.to_string());
    }

    // ---- votes ----

    /// Flips the user's vote on `item_id` right away and confirms with the
    /// gateway. Ignored while a toggle for the same item is in flight.
    pub fn toggle_vote(&mut self, item_id: &str) {
        if !self.require_session("upvote items") {
            return;
        }
        if self.pending_votes.contains_key(item_id) {
            debug!("vote on {item_id} already in flight");
            return;
        }
        let was_member = self.votes.contains(item_id);
        let delta = if was_member {
            self.votes.remove(item_id);
            -1
        } else {
            self.votes.insert(item_id.to_string());
            1
        };
        if let Some(item) = self.item_mut(item_id) {
            item.upvote_count = (item.upvote_count + delta).max(0);
        }
        self.pending_votes.insert(
            item_id.to_string(),
            PendingVote {
                was_member,
                delta,
                authoritative: false,
            },
        );
        tasks::toggle_vote(self.api.clone(), self.tx.clone(), item_id.to_string());
    }

    // ---- comments ----

    /// Opens or closes the comment panel of an item. Opening subscribes to
    /// the item's room and fetches the comments the first time.
    pub fn toggle_comments(&mut self, item_id: &str) {
        if self.panels.remove(item_id).is_some() {
            self.leave_room(item_id);
            return;
        }

        let cached = self.comments.contains_key(item_id);
        let state = if cached {
            PanelState::Expanded
        } else {
            PanelState::Expanding
        };
        self.panels.insert(item_id.to_string(), state);
        if let Some(session) = &self.session {
            // Re-sent for every expanded panel once the channel connects.
            if let Err(err) = session.realtime.join_item(item_id) {
                warn!("cannot join room for {item_id} yet: {err}");
            }
        }
        if !cached && self.comments_loading.insert(item_id.to_string()) {
            tasks::load_comments(self.api.clone(), self.tx.clone(), item_id.to_string());
        }
    }

    pub fn add_comment(&mut self, item_id: &str, content: &str) {
        self.submit_comment(item_id, None, content);
    }

    pub fn add_reply(&mut self, item_id: &str, parent_id: &str, content: &str) {
        self.submit_comment(item_id, Some(parent_id.to_string()), content);
    }

    fn submit_comment(&mut self, item_id: &str, parent_id: Option<String>, content: &str) {
        if !self.require_session("comment") {
            return;
        }
        let content = match validate_comment(content) {
            Ok(content) => content,
            Err(err) => {
                self.notify_error("Invalid comment", err.user_message());
                return;
            }
        };
        if let Some(parent) = &parent_id {
            let depth = self
                .comments
                .get(item_id)
                .and_then(|tree| comment_tree::depth_of(tree, parent));
            match depth {
                None => {
                    self.notify_error("Cannot reply", "That comment no longer exists.");
                    return;
                }
                Some(depth) if depth >= MAX_REPLY_DEPTH => {
                    self.notify_error("Cannot reply", "This thread is too deeply nested.");
                    return;
                }
                Some(_) => {}
            }
        }
        let Some(user) = self.current_user().cloned() else {
            return;
        };

        let op = self.next_op();
        let placeholder = Comment {
            id: format!("pending-{}", Uuid::new_v4()),
            author_id: user.id,
            author_name: user.username,
            content: content.clone(),
            created_at: Utc::now().to_rfc3339(),
            parent_id: parent_id.clone(),
            children: Vec::new(),
        };
        let placeholder_id = placeholder.id.clone();
        if let Some(tree) = self.comments.get_mut(item_id) {
            *tree = comment_tree::attach(tree, parent_id.as_deref(), placeholder);
        }
        self.pending_comments.insert(
            op,
            PendingComment::Create {
                item_id: item_id.to_string(),
                placeholder_id,
                parent_id: parent_id.clone(),
            },
        );
        tasks::create_comment(
            self.api.clone(),
            self.tx.clone(),
            op,
            item_id.to_string(),
            content,
            parent_id,
        );
    }

    pub fn edit_comment(&mut self, item_id: &str, comment_id: &str, content: &str) {
        if !self.require_session("edit comments") {
            return;
        }
        let content = match validate_comment(content) {
            Ok(content) => content,
            Err(err) => {
                self.notify_error("Invalid comment", err.user_message());
                return;
            }
        };
        let Some(existing) = self.owned_comment(item_id, comment_id) else {
            return;
        };
        let edited = Comment {
            content: content.clone(),
            ..existing.clone()
        };
        if let Some(tree) = self.comments.get_mut(item_id) {
            *tree = comment_tree::update_comment(tree, &edited);
        }
        let op = self.next_op();
        self.pending_comments.insert(
            op,
            PendingComment::Edit {
                item_id: item_id.to_string(),
                previous: existing,
            },
        );
        tasks::edit_comment(
            self.api.clone(),
            self.tx.clone(),
            op,
            comment_id.to_string(),
            content,
        );
    }

    pub fn delete_comment(&mut self, item_id: &str, comment_id: &str) {
        if !self.require_session("delete comments") {
            return;
        }
        if self.owned_comment(item_id, comment_id).is_none() {
            return;
        }
        let Some(tree) = self.comments.get_mut(item_id) else {
            return;
        };
        let (pruned, detached) = comment_tree::detach(tree, comment_id);
        let Some(detached) = detached else {
            return;
        };
        *tree = pruned;
        let op = self.next_op();
        self.pending_comments.insert(
            op,
            PendingComment::Delete {
                item_id: item_id.to_string(),
                detached,
            },
        );
        tasks::delete_comment(self.api.clone(), self.tx.clone(), op, comment_id.to_string());
    }

    /// Looks up a loaded comment the current user wrote, raising a notice
    /// when there is none.
    fn owned_comment(&mut self, item_id: &str, comment_id: &str) -> Option<Comment> {
        let found = self
            .comments
            .get(item_id)
            .and_then(|tree| comment_tree::find(tree, comment_id))
            .cloned();
        let Some(comment) = found else {
            self.notify_error("Comment not found", "That comment no longer exists.");
            return None;
        };
        let is_author = self
            .current_user()
            .is_some_and(|user| user.id == comment.author_id);
        if !is_author {
            self.notify_error("Not allowed", "You can only change your own comments.");
            return None;
        }
        Some(comment)
    }

    // ---- notifications ----

    pub fn load_notifications(&mut self) {
        if !self.is_authenticated() {
            debug!("notifications need a session");
            return;
        }
        self.notifications.loading = true;
        tasks::load_notifications(self.api.clone(), self.tx.clone(), self.session_epoch);
    }

    pub fn load_unread_count(&mut self) {
        if !self.is_authenticated() {
            return;
        }
        tasks::load_unread_count(self.api.clone(), self.tx.clone(), self.session_epoch);
    }

    pub fn mark_notification_read(&mut self, notification_id: &str) {
        if !self.is_authenticated() {
            return;
        }
        let already_read = self
            .notifications
            .entries
            .iter()
            .any(|n| n.id == notification_id && n.is_read);
        if already_read {
            return;
        }
        tasks::mark_notification_read(
            self.api.clone(),
            self.tx.clone(),
            self.session_epoch,
            notification_id.to_string(),
        );
    }

    pub fn mark_all_notifications_read(&mut self) {
        if !self.is_authenticated() {
            return;
        }
        tasks::mark_all_notifications_read(
            self.api.clone(),
            self.tx.clone(),
            self.session_epoch,
        );
    }

    pub fn delete_notification(&mut self, notification_id: &str) {
        if !self.is_authenticated() {
            return;
        }
        tasks::delete_notification(
            self.api.clone(),
            self.tx.clone(),
            self.session_epoch,
            notification_id.to_string(),
        );
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.is_empty() || password.is_empty() {
        return Err(RoadmapError::validation("Email and password are required"));
    }
    if !EMAIL.is_match(email) {
        return Err(RoadmapError::validation("Please enter a valid email address"));
    }
    Ok(())
}

/// Trims and checks comment text.
pub(super) fn validate_comment(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(RoadmapError::validation("Comment cannot be empty"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(RoadmapError::validation(format!(
            "Comment cannot be longer than {MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_text_is_trimmed_and_bounded() {
        assert_eq!(validate_comment("  hello ").expect("valid"), "hello");
        assert!(validate_comment("   ").is_err());
        assert!(validate_comment(&"x".repeat(MAX_COMMENT_LEN)).is_ok());
        assert!(validate_comment(&"x".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }

    #[test]
    fn credentials_need_a_plausible_email() {
        assert!(validate_credentials("jane@example.com", "pw").is_ok());
        assert!(validate_credentials("jane", "pw").is_err());
        assert!(validate_credentials("jane@example.com", "").is_err());
    }
}
