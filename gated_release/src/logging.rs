use std::str::FromStr;

use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::config::{LogFormat, LoggingProperties};

/// Crates of this workspace that log.
const CRATES: [&str; 4] = ["gated_release", "twopc", "pvss", "circuit"];

fn format_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let f = fmt::layer().with_thread_ids(true).with_thread_names(true);
    match format {
        LogFormat::Compact => f.compact().boxed(),
        LogFormat::Json => f.json().boxed(),
    }
}

/// Filter directives: the custom filter if set, otherwise `level` for every
/// workspace crate.
pub fn directives(logging: &LoggingProperties) -> anyhow::Result<String> {
    Ok(match &logging.filter {
        Some(filter) => filter.clone(),
        None => {
            let level = Level::from_str(&logging.level)?;
            CRATES
                .iter()
                .map(|c| format!("{c}={level}"))
                .collect::<Vec<_>>()
                .join(",")
        }
    })
}

pub fn init_tracing(logging: &LoggingProperties) -> anyhow::Result<()> {
    let filter_layer = EnvFilter::builder().parse(directives(logging)?)?;

    Registry::default()
        .with(filter_layer)
        .with(format_layer(logging.format))
        .try_init()?;

    Ok(())
}
