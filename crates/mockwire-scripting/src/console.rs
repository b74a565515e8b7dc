//! `console` binding exposed to mock scripts

use rhai::{Dynamic, Engine};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn, Span};

/// Logger handed to scripts as `console`
///
/// Output goes through `tracing`, inside the span of the request that runs
/// the script.
#[derive(Debug, Clone)]
pub struct Console {
    mock: Arc<str>,
    span: Span,
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Console {
    /// Create a console for `mock`, logging inside `span`
    pub fn new(mock: impl Into<Arc<str>>, span: Span) -> Self {
        Self {
            mock: mock.into(),
            span,
        }
    }

    fn emit(&self, level: Level, args: &[Dynamic]) {
        let message = render(args);
        let _guard = self.span.enter();
        let mock = &*self.mock;
        match level {
            Level::Trace => trace!(mock, "{message}"),
            Level::Debug => debug!(mock, "{message}"),
            Level::Info => info!(mock, "{message}"),
            Level::Warn => warn!(mock, "{message}"),
            Level::Error => error!(mock, "{message}"),
        }
    }

    /// Register the `Console` type and its methods on `engine`
    ///
    /// `debug` is a Rhai keyword, so debug-level output comes from the
    /// built-in `debug(..)` statement and `console.trace` logs below it.
    pub fn register(engine: &mut Engine) {
        engine.register_type_with_name::<Console>("Console");

        for (name, level) in [
            ("log", Level::Info),
            ("info", Level::Info),
            ("trace", Level::Trace),
            ("warn", Level::Warn),
            ("error", Level::Error),
        ] {
            engine.register_fn(name, move |c: &mut Console, a: Dynamic| c.emit(level, &[a]));
            engine.register_fn(name, move |c: &mut Console, a: Dynamic, b: Dynamic| {
                c.emit(level, &[a, b])
            });
            engine.register_fn(
                name,
                move |c: &mut Console, a: Dynamic, b: Dynamic, d: Dynamic| c.emit(level, &[a, b, d]),
            );
            engine.register_fn(
                name,
                move |c: &mut Console, a: Dynamic, b: Dynamic, d: Dynamic, e: Dynamic| {
                    c.emit(level, &[a, b, d, e])
                },
            );
        }
    }

    /// Route Rhai `print` and `debug` statements to the same logger
    pub fn hook_print(&self, engine: &mut Engine) {
        let console = self.clone();
        engine.on_print(move |text| console.emit(Level::Info, &[Dynamic::from(text.to_string())]));

        let console = self.clone();
        engine.on_debug(move |text, _source, pos| {
            let line = pos.line().map(|l| format!(" (line {l})")).unwrap_or_default();
            console.emit(Level::Debug, &[Dynamic::from(format!("{text}{line}"))]);
        });
    }
}

/// Strings are written as-is, everything else in its debug form
fn render(args: &[Dynamic]) -> String {
    args.iter()
        .map(|arg| {
            if arg.is_string() {
                arg.to_string()
            } else {
                format!("{arg:?}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
