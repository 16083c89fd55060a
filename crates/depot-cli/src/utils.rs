use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use depot_config::{path::resolve_path, ConfigSource};
use depot_core::{DepotContext, DepotResult};
use nu_ansi_term::Color;
use tabled::{
    builder::Builder,
    settings::{themes::BorderCorrection, Panel, Style},
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct Icons;

impl Icons {
    pub const ARROW: &str = "→";
    pub const CHECK: &str = "✓";
    pub const CROSS: &str = "✗";
}

static COLOR: AtomicBool = AtomicBool::new(true);

pub fn disable_color() {
    COLOR.store(false, Ordering::Relaxed);
}

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if COLOR.load(Ordering::Relaxed) {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Configuration source honouring `-c/--config`.
pub fn config_source(config: Option<&str>) -> DepotResult<ConfigSource> {
    let source = ConfigSource::from_env();
    match config {
        Some(path) => Ok(source.with_path(resolve_path(path)?)),
        None => Ok(source),
    }
}

/// Loads the configuration and, when `startup` is set, validates every
/// capability and applies migrations as `RunMigrationsAtStartup` allows.
pub fn load_context(config: Option<&str>, startup: bool) -> DepotResult<Arc<DepotContext>> {
    let source = config_source(config)?;
    let ctx = DepotContext::load(&source)?;
    if startup {
        ctx.validate_startup()?;
    }
    Ok(Arc::new(ctx))
}

/// Renders a table with a header row, in the style used by every command.
pub fn render_table<I, R>(title: &str, header: R, rows: I) -> String
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    let mut builder = Builder::new();
    builder.push_record(header);
    for row in rows {
        builder.push_record(row);
    }

    builder
        .build()
        .with(Panel::header(title))
        .with(Style::rounded())
        .with(BorderCorrection {})
        .to_string()
}

/// A token cancelled on Ctrl-C.
pub fn cancel_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });
    token
}
