/// Logs a record tagged with the component that emitted it.
/// Usage:
/// ```rust,ignore
/// agent_log!(Level::Info, "supervisor", "Subprocess started");
/// agent_log!(Level::Error, "db", "Write failed: {}", err);
/// ```
/// The component becomes the record target, so the fern format renders:
/// [2025-04-25T16:32:10+02:00][DEBUG][supervisor][pid=4568][tid=ThreadId(1)] Your message here
#[macro_export]
macro_rules! agent_log {
    ($level:expr, $component:expr, $fmt:expr $(, $($arg:tt)+)?) => {
        log::log!(target: $component, $level, $fmt $(, $($arg)+)?)
    };
}
