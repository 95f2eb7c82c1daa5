use time::macros::format_description;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the `info` default.
///
/// Records emitted through the `log` facade (actix's request logger) are
/// bridged into the same subscriber.
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let time_format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_timer(fmt::time::LocalTime::new(time_format))
                .with_target(true)
                .with_level(true)
                .with_thread_names(false)
                .with_line_number(false)
                .with_file(false)
                .compact(),
        )
        .with(filter)
        .try_init();
}

/// Run a block and log how long it took at info level.
///
/// ```ignore
/// let rows = timeit!("executed generated query", { gateway.query(&sql, &params).await })?;
/// ```
#[macro_export]
macro_rules! timeit {
    ($label:expr, $body:block) => {{
        let __started = ::std::time::Instant::now();
        let __result = $body;
        ::tracing::info!(
            elapsed_ms = __started.elapsed().as_millis() as u64,
            "{}",
            $label
        );
        __result
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn timeit_returns_block_value() {
        let value = timeit!("adding", { 40 + 2 });
        assert_eq!(value, 42);
    }

    #[test]
    fn init_logger_is_idempotent() {
        super::init_logger();
        super::init_logger();
    }
}
