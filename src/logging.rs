//! Internal logging helpers for structured group-by events.

use ulid::Ulid;

/// Single logging target for the crate.
pub(crate) const LOG_TARGET: &str = "spillgroup";

/// Request scope appended to every log line of one invocation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LogContext {
    request: Ulid,
}

impl LogContext {
    pub(crate) const fn new(request: Ulid) -> Self {
        Self { request }
    }

    pub(crate) fn request(&self) -> Ulid {
        self.request
    }
}

macro_rules! group_log {
    ($level:expr, ctx: $ctx:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        if log::log_enabled!(target: crate::logging::LOG_TARGET, $level) {
            log::log!(
                target: crate::logging::LOG_TARGET,
                $level,
                "event={} request={} {}",
                $event,
                $ctx.request(),
                format_args!($fmt $(, $args)*)
            );
        }
    }};
}

pub(crate) use group_log;
