use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Crates whose events are shown at info level unless `RUST_LOG` says otherwise.
const DEFAULT_TARGETS: &[&str] = &["ingestion_service", "generation_ingest", "generation_api"];

pub fn init_tracing() {
    let mut filter = EnvFilter::from_default_env();
    for target in DEFAULT_TARGETS {
        filter = filter.add_directive(
            format!("{target}=info")
                .parse()
                .unwrap_or_else(|_| LevelFilter::INFO.into()),
        );
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
