use std::fmt;
use std::str::FromStr;

use anstream::ColorChoice;
use anyhow::Context;
use jiff::Timestamp;
use tracing::Subscriber;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Only show warnings by default (overridable by `RUST_LOG`).
    #[default]
    Default,
    /// Show debug messages by default (overridable by `RUST_LOG`).
    Verbose,
    /// Show trace messages, with timestamps and the enclosing spans of each event.
    ExtraVerbose,
}

impl Level {
    /// Map a `-v` count to a level.
    pub fn from_verbosity(verbose: u8) -> Self {
        match verbose {
            0 => Self::Default,
            1 => Self::Verbose,
            _ => Self::ExtraVerbose,
        }
    }

    /// The filter applied when `RUST_LOG` is unset.
    fn default_directive(self) -> anyhow::Result<Directive> {
        let directive = match self {
            Self::Default => LevelFilter::WARN.into(),
            Self::Verbose => Directive::from_str("spool=debug")?,
            Self::ExtraVerbose => Directive::from_str("spool=trace")?,
        };
        Ok(directive)
    }
}

/// Writes event timestamps with `jiff`.
#[derive(Debug, Clone, Copy, Default)]
struct JiffTime;

impl FormatTime for JiffTime {
    fn format_time(&self, writer: &mut Writer<'_>) -> fmt::Result {
        write!(writer, "{}", Timestamp::now())
    }
}

/// The formatting layer for the given [`Level`].
///
/// Timestamps and targets are only shown at [`Level::ExtraVerbose`].
fn format_layer<S, W>(level: Level, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    match level {
        Level::Default | Level::Verbose => {
            let format = tracing_subscriber::fmt::format()
                .without_time()
                .with_target(false);
            layer.event_format(format).boxed()
        }
        Level::ExtraVerbose => {
            let format = tracing_subscriber::fmt::format()
                .with_timer(JiffTime)
                .with_target(true);
            layer.event_format(format).boxed()
        }
    }
}

/// Configure `tracing` for the given [`Level`], taking into account the `RUST_LOG` environment
/// variable.
///
/// Events are written to stderr; colors follow `anstream`'s detection of the terminal.
pub fn setup_logging(level: Level) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.default_directive()?)
        .from_env()
        .context("Invalid RUST_LOG directives")?;

    let ansi = match anstream::Stderr::choice(&std::io::stderr()) {
        ColorChoice::Always | ColorChoice::AlwaysAnsi => true,
        ColorChoice::Never | ColorChoice::Auto => false,
    };

    tracing_subscriber::registry()
        .with(format_layer(level, std::io::stderr, ansi).with_filter(filter))
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(level: Level, f: impl FnOnce()) -> String {
        let buffer = Buffer::default();
        let subscriber =
            tracing_subscriber::registry().with(format_layer(level, buffer.clone(), false));
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn plain() {
        let output = capture(Level::Verbose, || {
            tracing::info!("Selecting foo==1.0");
        });
        assert_eq!(output.trim_start(), "INFO Selecting foo==1.0\n");
    }

    #[test]
    fn spans() {
        let output = capture(Level::Verbose, || {
            let outer = tracing::info_span!("resolve");
            let _outer = outer.enter();
            let inner = tracing::info_span!("round");
            let _inner = inner.enter();
            tracing::debug!("Pinning foo");
        });
        assert!(output.contains("resolve:round:"), "{output}");
        assert!(output.ends_with("Pinning foo\n"), "{output}");
    }

    #[test]
    fn extra_verbose() {
        let output = capture(Level::ExtraVerbose, || {
            tracing::trace!("Pinning foo");
        });
        assert!(output.starts_with(|c: char| c.is_ascii_digit()), "{output}");
        assert!(output.contains("TRACE"), "{output}");
        assert!(output.contains("spool_logging::tests"), "{output}");
    }

    #[test]
    fn verbosity() {
        assert_eq!(Level::from_verbosity(0), Level::Default);
        assert_eq!(Level::from_verbosity(1), Level::Verbose);
        assert_eq!(Level::from_verbosity(3), Level::ExtraVerbose);
    }
}
