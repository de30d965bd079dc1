use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use roadmap_frontend::models::{ItemQuery, NotificationQuery};
use roadmap_frontend::{ApiClient, CredentialStore, RoadmapApi};

pub struct Scenario {
    pub api_url: String,
    pub first_email: String,
    pub second_email: String,
    pub password: String,
    pub require_notification: bool,
}

#[derive(Debug)]
pub struct Report {
    pub item_title: String,
    pub comment_id: String,
    pub reply_id: String,
    pub notifications: usize,
}

impl Scenario {
    /// Two users, one comment, one reply, then the first user's inbox.
    pub fn run(&self) -> Result<Report> {
        // Separate in-memory stores so the two sessions never share a token.
        let first = ApiClient::new(self.api_url.clone(), CredentialStore::in_memory())?;
        let second = ApiClient::new(self.api_url.clone(), CredentialStore::in_memory())?;

        info!("step 1: logging in {}", self.first_email);
        let first_user = first
            .login(&self.first_email, &self.password)
            .with_context(|| format!("login as {} failed", self.first_email))?;
        info!(username = %first_user.username, "first user logged in");

        info!("step 2: logging in {}", self.second_email);
        let second_user = second
            .login(&self.second_email, &self.password)
            .with_context(|| format!("login as {} failed", self.second_email))?;
        info!(username = %second_user.username, "second user logged in");
        if first_user.id == second_user.id {
            bail!("both emails resolve to the same account");
        }

        info!("step 3: listing roadmap items");
        let items = first
            .list_items(&ItemQuery::default())
            .context("listing roadmap items failed")?;
        let Some(item) = items.into_iter().next() else {
            bail!("the roadmap is empty; seed at least one item");
        };
        info!(item = %item.title, "picked first item");

        info!("step 4: first user comments");
        let comment = first
            .create_comment(&item.id, "This is a test comment from User 1", None)
            .context("creating the comment failed")?;
        info!(comment = %comment.id, "comment created");

        info!("step 5: second user replies");
        let reply = second
            .create_comment(
                &item.id,
                "This is a reply from User 2 - should trigger notification!",
                Some(&comment.id),
            )
            .context("creating the reply failed")?;
        info!(reply = %reply.id, "reply created");

        info!("step 6: checking the first user's notifications");
        let page = first
            .list_notifications(&NotificationQuery::default())
            .context("listing notifications failed")?;
        let notifications = page.notifications.len();
        match page.notifications.first() {
            Some(latest) => info!(title = %latest.title, message = %latest.message, "latest notification"),
            None if self.require_notification => bail!("no notification reached the first user"),
            None => warn!("the first user has no notifications"),
        }

        Ok(Report {
            item_title: item.title,
            comment_id: comment.id,
            reply_id: reply.id,
            notifications,
        })
    }
}
