mod scenario;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scenario::Scenario;

/// Replays the reply-notification flow against a running roadmap backend.
#[derive(Parser, Debug)]
#[command(author, version, about = "Roadmap backend notification smoke test")]
struct Args {
    /// Base URL of the REST API
    #[arg(long, default_value = "http://localhost:5000/api")]
    api_url: String,

    /// Account that writes the comment and should be notified
    #[arg(long, default_value = "alice@example.com")]
    first_email: String,

    /// Account that replies
    #[arg(long, default_value = "bob@example.com")]
    second_email: String,

    /// Password shared by both accounts
    #[arg(long, default_value = "password123")]
    password: String,

    /// Fail unless the first account ends up with at least one notification
    #[arg(long)]
    require_notification: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,roadmap_frontend=warn")),
        )
        .init();

    let args = Args::parse();
    let scenario = Scenario {
        api_url: args.api_url,
        first_email: args.first_email,
        second_email: args.second_email,
        password: args.password,
        require_notification: args.require_notification,
    };
    match scenario.run() {
        Ok(report) => {
            tracing::info!(
                item = %report.item_title,
                comment = %report.comment_id,
                reply = %report.reply_id,
                notifications = report.notifications,
                "smoke test passed"
            );
            Ok(())
        }
        Err(err) => {
            tracing::error!("smoke test failed: {err:#}");
            Err(err)
        }
    }
}
