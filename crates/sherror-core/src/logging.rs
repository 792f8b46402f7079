use crate::Result;

/// Initialize tracing for sherror.
///
/// Default: info for our crates, warn for everything else. Can be overridden
/// with `RUST_LOG`. Calling this twice is harmless; the second install is ignored.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,sherror=info,sherror_core=info,sherror_github=info,{}=info",
            service_name.replace('-', "_")
        ))
    });

    if let Err(e) = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
    {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }

    Ok(())
}
