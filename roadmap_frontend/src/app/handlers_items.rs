use std::collections::HashSet;

use log::{debug, warn};

use crate::error::Result;
use crate::models::{BulkCreated, ItemTemplate, RoadmapItem, VoteAction, VoteToggle};
use crate::realtime::VoteChanged;

use super::state::SeedKind;
use super::tasks;
use super::RoadmapApp;

impl RoadmapApp {
    pub(super) fn handle_items_loaded(&mut self, generation: u64, result: Result<Vec<RoadmapItem>>) {
        if generation != self.items_generation {
            debug!(
                "discarding item list {generation}, newest is {}",
                self.items_generation
            );
            return;
        }
        self.items_loading = false;
        match result {
            Ok(items) => {
                self.items = items;
                self.items_error = None;
                if self.is_authenticated() {
                    self.absorb_listed_votes();
                    self.load_vote_membership();
                }
            }
            Err(err) => {
                warn!("failed to load roadmap items: {err}");
                self.items_error = Some(err.user_message());
                self.notify_error("Failed to load roadmap items", err.user_message());
            }
        }
    }

    /// Takes membership from listings that carry a per-user `hasVoted` flag.
    fn absorb_listed_votes(&mut self) {
        for item in &self.items {
            let Some(has_voted) = item.has_voted else {
                continue;
            };
            if self.pending_votes.contains_key(&item.id) {
                continue;
            }
            if has_voted {
                self.votes.insert(item.id.clone());
            } else {
                self.votes.remove(&item.id);
            }
            self.vote_checked.insert(item.id.clone());
        }
    }

    /// Looks up membership for listed items not yet checked this session.
    pub(super) fn load_vote_membership(&mut self) {
        let unchecked: Vec<String> = self
            .items
            .iter()
            .filter(|item| !self.vote_checked.contains(&item.id))
            .map(|item| item.id.clone())
            .collect();
        if unchecked.is_empty() {
            return;
        }
        tasks::load_vote_membership(
            self.api.clone(),
            self.tx.clone(),
            self.session_epoch,
            unchecked,
        );
    }

    pub(super) fn handle_vote_membership_loaded(
        &mut self,
        session: u64,
        checked: Vec<String>,
        voted: HashSet<String>,
    ) {
        if !self.is_current_session(session) {
            debug!("dropping vote membership from an earlier session");
            return;
        }
        for item_id in checked {
            // A toggle issued since the lookup is newer than its answer.
            if self.pending_votes.contains_key(&item_id) || self.vote_checked.contains(&item_id) {
                continue;
            }
            if voted.contains(&item_id) {
                self.votes.insert(item_id.clone());
            } else {
                self.votes.remove(&item_id);
            }
            self.vote_checked.insert(item_id);
        }
    }

    pub(super) fn handle_vote_toggled(&mut self, item_id: String, result: Result<VoteToggle>) {
        let Some(pending) = self.pending_votes.remove(&item_id) else {
            debug!("vote result for {item_id} outside its session");
            return;
        };
        match result {
            Ok(toggle) => {
                match toggle.action {
                    VoteAction::Added => self.votes.insert(item_id.clone()),
                    VoteAction::Removed => self.votes.remove(&item_id),
                };
                self.vote_checked.insert(item_id.clone());
                if let Some(item) = self.item_mut(&item_id) {
                    item.upvote_count = toggle.vote_count;
                }
            }
            Err(err) => {
                warn!("vote on {item_id} failed: {err}");
                if pending.was_member {
                    self.votes.insert(item_id.clone());
                } else {
                    self.votes.remove(&item_id);
                }
                if !pending.authoritative {
                    if let Some(item) = self.item_mut(&item_id) {
                        item.upvote_count = (item.upvote_count - pending.delta).max(0);
                    }
                }
                self.notify_error("Failed to update vote", err.user_message());
            }
        }
    }

    /// Another client (or this one) changed a vote count.
    pub(super) fn handle_stream_vote(&mut self, change: VoteChanged) {
        if let Some(pending) = self.pending_votes.get_mut(&change.item_id) {
            pending.authoritative = true;
        }
        match self.item_mut(&change.item_id) {
            Some(item) => item.upvote_count = change.vote_count,
            None => debug!("vote update for unlisted item {}", change.item_id),
        }
        let mine = self
            .current_user()
            .zip(change.user_id.as_deref())
            .is_some_and(|(user, voter)| user.id == voter);
        if mine && !self.pending_votes.contains_key(&change.item_id) {
            match change.action {
                VoteAction::Added => self.votes.insert(change.item_id.clone()),
                VoteAction::Removed => self.votes.remove(&change.item_id),
            };
            self.vote_checked.insert(change.item_id);
        }
    }

    pub(super) fn handle_item_created(&mut self, result: Result<RoadmapItem>) {
        match result {
            Ok(item) => {
                let title = item.title.clone();
                if self.item(&item.id).is_none() {
                    self.items.insert(0, item);
                }
                self.notify("Roadmap item created", title);
            }
            Err(err) => self.notify_error("Failed to create item", err.user_message()),
        }
    }

    pub(super) fn handle_items_seeded(
        &mut self,
        kind: SeedKind,
        requested: u32,
        result: Result<BulkCreated>,
    ) {
        self.seeding = false;
        match result {
            Ok(created) => {
                let count = created.count.unwrap_or(created.items.len() as u32);
                // Prepend in reverse so the batch keeps the server's order.
                for item in created.items.into_iter().rev() {
                    if self.item(&item.id).is_none() {
                        self.items.insert(0, item);
                    }
                }
                let title = match kind {
                    SeedKind::Bulk => "Bulk creation complete",
                    SeedKind::Demo => "Demo data created",
                };
                self.notify(title, format!("Created {count} of {requested} roadmap items."));
            }
            Err(err) => {
                let title = match kind {
                    SeedKind::Bulk => "Failed to create bulk items",
                    SeedKind::Demo => "Failed to create demo data",
                };
                self.notify_error(title, err.user_message());
            }
        }
    }

    pub(super) fn handle_templates_loaded(&mut self, result: Result<Vec<ItemTemplate>>) {
        match result {
            Ok(templates) => {
                debug!("{} item templates available", templates.len());
                self.templates = templates;
            }
            Err(err) => self.notify_error("Failed to load templates", err.user_message()),
        }
    }

    pub(super) fn handle_item_updated(&mut self, item_id: String, result: Result<RoadmapItem>) {
        match result {
            Ok(updated) => {
                let title = updated.title.clone();
                match self.item_mut(&item_id) {
                    Some(item) => *item = updated,
                    None => debug!("updated item {item_id} is not listed"),
                }
                self.notify("Roadmap item updated", title);
            }
            Err(err) => self.notify_error("Failed to update item", err.user_message()),
        }
    }

    pub(super) fn handle_item_deleted(&mut self, item_id: String, result: Result<()>) {
        match result {
            Ok(()) => {
                self.items.retain(|item| item.id != item_id);
                self.comments.remove(&item_id);
                self.votes.remove(&item_id);
                self.vote_checked.remove(&item_id);
                if self.panels.remove(&item_id).is_some() {
                    self.leave_room(&item_id);
                }
                self.notify("Roadmap item deleted", "The item has been removed.");
            }
            Err(err) => self.notify_error("Failed to delete item", err.user_message()),
        }
    }
}
