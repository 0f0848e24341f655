use std::path::Path;

use once_cell::sync::OnceCell;
use tracing_subscriber::{
    fmt, fmt::time::UtcTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::error::{AppError, AppResult};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();
static LOGGER_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

const DEFAULT_LOG_DIRECTIVES: &str = "info,app::schedule=debug,app::db=info";

/// Initialize the global tracing subscriber.
///
/// Logs go to stderr; when `log_dir` is given, a daily-rolling file layer is
/// added as well. Safe to call more than once; later calls are no-ops.
pub fn init_logging(log_dir: Option<&Path>) -> AppResult<()> {
    LOGGER_INIT
        .get_or_try_init(|| {
            let env_filter = EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_DIRECTIVES))
                .map_err(|err| AppError::other(format!("failed to parse log directives: {err}")))?;

            let registry = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(std::io::stderr),
            );

            if let Some(dir) = log_dir {
                std::fs::create_dir_all(dir)?;

                let file_appender = tracing_appender::rolling::daily(dir, "carpool-scheduler.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                LOGGER_GUARD
                    .set(guard)
                    .map_err(|_| AppError::other("logger already initialized"))?;

                registry
                    .with(
                        fmt::layer()
                            .with_writer(non_blocking)
                            .with_ansi(false)
                            .with_target(true)
                            .with_timer(UtcTime::rfc_3339()),
                    )
                    .init();
            } else {
                registry.init();
            }

            Ok(())
        })
        .map(|_| ())
}
