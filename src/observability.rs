use sentry::ClientInitGuard;
use sentry_tracing::EventFilter;
use tracing_subscriber::{
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::SentryConfig;

/// Installs the global subscriber. Logs go to stderr so stdout only carries
/// command output.
pub fn init_tracing_and_sentry(sentry_config: SentryConfig) -> Option<ClientInitGuard> {
    let guard = if sentry_config.dsn.is_empty() {
        None
    } else {
        Some(sentry::init((
            sentry_config.dsn,
            sentry::ClientOptions {
                release: Some(env!("CARGO_PKG_VERSION").into()),
                traces_sample_rate: sentry_config.sample_rate,
                ..Default::default()
            },
        )))
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    let sentry_layer = sentry_tracing::layer().event_filter(|md| match md.level() {
        &tracing::Level::ERROR => EventFilter::Event,
        _ => EventFilter::Ignore,
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(fmt_layer)
        .with(sentry_layer)
        .init();

    guard
}
