use std::borrow::Cow;

use tracing::Level;

use crate::compiler::CompiledQuery;

use super::{InterceptAction, Interceptor};

/// Longest prefix of `sql` within `max_bytes` that ends on a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let end = (0..=max_bytes)
        .rev()
        .find(|&i| sql.is_char_boundary(i))
        .unwrap_or(0);
    &sql[..end]
}

/// Logs each statement on `persistmap.sql` just before it runs.
///
/// Enabled by listing `"tracing"` in
/// [`ContextSettings::loggers`](crate::settings::ContextSettings).
#[derive(Debug, Clone)]
pub struct TracingInterceptor {
    level: Level,
    limit: Option<usize>,
}

impl TracingInterceptor {
    /// Log at `level`, cutting statements longer than `limit` bytes.
    pub fn new(level: Level, limit: Option<usize>) -> Self {
        Self { level, limit }
    }

    pub(super) fn shorten<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        match self.limit {
            Some(max) if sql.len() > max => {
                Cow::Owned(format!("{}...", truncate_sql_bytes(sql, max)))
            }
            _ => Cow::Borrowed(sql),
        }
    }
}

impl Default for TracingInterceptor {
    fn default() -> Self {
        Self::new(Level::DEBUG, Some(200))
    }
}

fn log_statement(level: Level, sql: &str, params: usize) {
    match level {
        Level::ERROR => tracing::error!(target: "persistmap.sql", params, "{sql}"),
        Level::WARN => tracing::warn!(target: "persistmap.sql", params, "{sql}"),
        Level::INFO => tracing::info!(target: "persistmap.sql", params, "{sql}"),
        Level::DEBUG => tracing::debug!(target: "persistmap.sql", params, "{sql}"),
        Level::TRACE => tracing::trace!(target: "persistmap.sql", params, "{sql}"),
    }
}

impl Interceptor for TracingInterceptor {
    fn before_execute(&self, query: &CompiledQuery) -> InterceptAction {
        log_statement(
            self.level,
            &self.shorten(query.sql()),
            query.parameters().len(),
        );
        InterceptAction::Continue
    }
}
