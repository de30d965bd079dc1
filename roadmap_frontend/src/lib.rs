pub mod api;
pub mod app;
pub mod comment_tree;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod realtime;

use std::time::Duration;

use log::{info, warn};

pub use api::{ApiClient, RoadmapApi};
pub use app::RoadmapApp;
pub use config::FrontendConfig;
pub use credentials::CredentialStore;
pub use error::{Result, RoadmapError};

/// Runs the coordinator without a screen: restores any stored session, lists
/// the roadmap and then applies results and live events as they arrive,
/// logging every notice. Does not return unless setup fails.
pub fn run_headless(config: &FrontendConfig) -> anyhow::Result<()> {
    let mut app = RoadmapApp::new(config)?;
    info!("using api {} and socket {}", config.api_url, config.socket_url);
    app.restore_session();
    app.refresh_items();

    let mut listed = None;
    loop {
        app.wait_for_message(Duration::from_millis(250));
        for notice in app.drain_notices() {
            match notice.level {
                app::NoticeLevel::Info => info!("{}: {}", notice.title, notice.description),
                app::NoticeLevel::Error => warn!("{}: {}", notice.title, notice.description),
            }
        }
        if !app.items_loading() && listed != Some(app.items().len()) {
            listed = Some(app.items().len());
            info!(
                "{} roadmap items listed, {} unread notifications",
                app.items().len(),
                app.unread_count()
            );
        }
    }
}
