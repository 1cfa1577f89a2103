//! Tracing setup (§10 "Logging"): `tracing-subscriber`'s `EnvFilter` + `fmt`
//! layer writes to stdout, `tracing-appender` mirrors the same events to a
//! daily-rolling file under `<data_root>/logs`, and a small redaction layer
//! masks secret-shaped field values before either sink sees them. Every
//! stage execution is expected to run inside a
//! `#[tracing::instrument(fields(item_id, stage, attempt))]` span so these
//! three values show up on every line without being threaded through log
//! call sites by hand.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const REDACTED_FIELD_SUBSTRINGS: &[&str] = &["api_key", "apikey", "token", "secret", "password", "private_key"];

/// Masks the value of any field whose name looks secret-shaped with `***`
/// while recording it, so redaction happens once here rather than at every
/// `tracing::info!`/`warn!` call site.
struct RedactingVisitor<'a> {
    writer: &'a mut dyn std::fmt::Write,
    first: bool,
}

impl<'a> tracing::field::Visit for RedactingVisitor<'a> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let name = field.name();
        let is_secret = REDACTED_FIELD_SUBSTRINGS.iter().any(|needle| name.to_ascii_lowercase().contains(needle));
        if !self.first {
            let _ = write!(self.writer, " ");
        }
        self.first = false;
        if is_secret {
            let _ = write!(self.writer, "{name}=***");
        } else {
            let _ = write!(self.writer, "{name}={value:?}");
        }
    }
}

#[derive(Default)]
struct RedactingFieldFormatter;

impl<'writer> tracing_subscriber::fmt::FormatFields<'writer> for RedactingFieldFormatter {
    fn format_fields<R: tracing::field::RecordFields>(
        &self,
        mut writer: tracing_subscriber::fmt::format::Writer<'writer>,
        fields: R,
    ) -> std::fmt::Result {
        let mut visitor = RedactingVisitor { writer: &mut writer, first: true };
        fields.record(&mut visitor);
        Ok(())
    }
}

/// Initializes the global tracing subscriber. Returns the `WorkerGuard` for
/// the file appender; the caller must hold this for the process lifetime
/// (dropping it stops the background flush thread and silently truncates
/// any buffered log lines).
pub fn init(log_dir: &Path, env_filter_default: &str) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "clipforge.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter_default));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .fmt_fields(RedactingFieldFormatter)
        .with_target(true)
        .with_writer(std::io::stdout);
    let file_layer = tracing_subscriber::fmt::layer()
        .fmt_fields(RedactingFieldFormatter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(non_blocking);

    tracing_subscriber::registry().with(filter).with(stdout_layer).with(file_layer).try_init()?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_field_names_are_detected() {
        for name in ["api_key", "API_KEY", "auth_token", "secret_value", "user_password", "rsa_private_key"] {
            assert!(
                REDACTED_FIELD_SUBSTRINGS.iter().any(|n| name.to_ascii_lowercase().contains(n)),
                "{name} should be flagged as secret-shaped"
            );
        }
        assert!(!REDACTED_FIELD_SUBSTRINGS.iter().any(|n| "item_id".contains(n)));
    }
}
