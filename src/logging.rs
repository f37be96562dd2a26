use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const LOG_ENV_VAR: &str = "WIKI_DIFF_NOTIFY_LOG";

/// Install the global subscriber; `WIKI_DIFF_NOTIFY_LOG` overrides the level
pub fn setup_logger(debug: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(if debug {
            LevelFilter::DEBUG.into()
        } else {
            LevelFilter::INFO.into()
        })
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let fmt = fmt::layer()
        .with_target(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry().with(fmt).with(env_filter).init();
}
