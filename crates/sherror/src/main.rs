use sherror_core::{config::Settings, Sherror, SherrorConfig};

#[tokio::main]
async fn main() -> Result<(), sherror_core::Error> {
    sherror_core::logging::init("sherror")?;

    let settings = Settings::from_env()?;
    let config = SherrorConfig::load(&settings.config_path)?;
    let remote = sherror_github::remote_from_settings(&settings)?;

    let mut client = Sherror::new(config)?.with_remote(remote);
    let report = client.sync().await?;

    tracing::info!(
        created = report.created.len(),
        updated = report.updated.len(),
        unchanged = report.unchanged.len(),
        "done"
    );
    Ok(())
}
