use roadmap_frontend::FrontendConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = FrontendConfig::from_env()?;
    roadmap_frontend::run_headless(&config)
}
