use log::{debug, warn};

use crate::comment_tree;
use crate::error::Result;
use crate::models::Comment;
use crate::realtime::{CommentChanged, CommentRemoved};

use super::state::{PanelState, PendingComment};
use super::RoadmapApp;

impl RoadmapApp {
    pub(super) fn handle_comments_loaded(&mut self, item_id: String, result: Result<Vec<Comment>>) {
        self.comments_loading.remove(&item_id);
        match result {
            Ok(tree) => {
                debug!(
                    "loaded {} comments for {item_id}",
                    comment_tree::count(&tree)
                );
                self.comments.insert(item_id.clone(), tree);
                if let Some(state) = self.panels.get_mut(&item_id) {
                    *state = PanelState::Expanded;
                }
            }
            Err(err) => {
                warn!("failed to load comments for {item_id}: {err}");
                if self.panels.remove(&item_id).is_some() {
                    self.leave_room(&item_id);
                }
                self.notify_error("Failed to load comments", err.user_message());
            }
        }
    }

    pub(super) fn handle_comment_created(&mut self, op: u64, result: Result<Comment>) {
        let Some(PendingComment::Create {
            item_id,
            placeholder_id,
            parent_id,
        }) = self.pending_comments.remove(&op)
        else {
            debug!("comment result {op} outside its session");
            return;
        };
        match result {
            Ok(comment) => {
                let is_reply = parent_id.is_some();
                if let Some(tree) = self.comments.get_mut(&item_id) {
                    let pruned = comment_tree::delete_comment(tree, &placeholder_id);
                    // The broadcast may have beaten the response here.
                    *tree = if comment_tree::contains(&pruned, &comment.id) {
                        pruned
                    } else {
                        let parent = comment.parent_id.clone().or(parent_id);
                        comment_tree::attach(&pruned, parent.as_deref(), comment)
                    };
                }
                if is_reply {
                    self.notify("Reply added", "Your reply has been posted.");
                } else {
                    self.notify("Comment added", "Your comment has been posted.");
                }
            }
            Err(err) => {
                warn!("comment on {item_id} failed: {err}");
                if let Some(tree) = self.comments.get_mut(&item_id) {
                    *tree = comment_tree::delete_comment(tree, &placeholder_id);
                }
                self.notify_error("Failed to add comment", err.user_message());
            }
        }
    }

    pub(super) fn handle_comment_edited(&mut self, op: u64, result: Result<Comment>) {
        let Some(PendingComment::Edit { item_id, previous }) = self.pending_comments.remove(&op)
        else {
            debug!("edit result {op} outside its session");
            return;
        };
        let Some(tree) = self.comments.get_mut(&item_id) else {
            return;
        };
        match result {
            Ok(updated) => {
                if comment_tree::contains(tree, &updated.id) {
                    let updated = comment_tree::carry_replies(tree, updated);
                    *tree = comment_tree::update_comment(tree, &updated);
                }
                self.notify("Comment updated", "Your changes have been saved.");
            }
            Err(err) => {
                warn!("edit of {} failed: {err}", previous.id);
                // Keep replies that arrived while the edit was in flight.
                if let Some(current) = comment_tree::find(tree, &previous.id) {
                    let restored = Comment {
                        children: current.children.clone(),
                        ..previous
                    };
                    *tree = comment_tree::update_comment(tree, &restored);
                }
                self.notify_error("Failed to update comment", err.user_message());
            }
        }
    }

    pub(super) fn handle_comment_deleted(&mut self, op: u64, result: Result<()>) {
        let Some(PendingComment::Delete { item_id, detached }) = self.pending_comments.remove(&op)
        else {
            debug!("delete result {op} outside its session");
            return;
        };
        match result {
            Ok(()) => self.notify("Comment deleted", "The comment has been removed."),
            Err(err) => {
                warn!("delete of {} failed: {err}", detached.node.id);
                if let Some(tree) = self.comments.get_mut(&item_id) {
                    if !comment_tree::contains(tree, &detached.node.id) {
                        *tree = comment_tree::restore(tree, detached);
                    }
                }
                self.notify_error("Failed to delete comment", err.user_message());
            }
        }
    }

    pub(super) fn handle_stream_comment_created(&mut self, change: CommentChanged) {
        let Some(tree) = self.comments.get_mut(&change.item_id) else {
            debug!("comment for unloaded item {} dropped", change.item_id);
            return;
        };
        if comment_tree::contains(tree, &change.comment.id) {
            debug!("comment {} already present", change.comment.id);
            return;
        }
        let parent = change.parent_id().map(str::to_string);
        if let Some(parent) = &parent {
            if !comment_tree::contains(tree, parent) {
                debug!("reply {} to unknown parent {parent} dropped", change.comment.id);
                return;
            }
        }
        let author = change.comment.author_name.clone();
        let author_id = change.comment.author_id.clone();
        *tree = comment_tree::attach(tree, parent.as_deref(), change.comment);

        let own = self.current_user().is_some_and(|user| user.id == author_id);
        if !own {
            self.notify("New comment", format!("{author} commented"));
        }
    }

    pub(super) fn handle_stream_comment_updated(&mut self, change: CommentChanged) {
        let Some(tree) = self.comments.get_mut(&change.item_id) else {
            return;
        };
        if !comment_tree::contains(tree, &change.comment.id) {
            debug!("update for unknown comment {}", change.comment.id);
            return;
        }
        let updated = comment_tree::carry_replies(tree, change.comment);
        *tree = comment_tree::update_comment(tree, &updated);
    }

    pub(super) fn handle_stream_comment_deleted(&mut self, removed: CommentRemoved) {
        let Some(tree) = self.comments.get_mut(&removed.item_id) else {
            return;
        };
        if comment_tree::contains(tree, &removed.comment_id) {
            *tree = comment_tree::delete_comment(tree, &removed.comment_id);
        }
    }
}
