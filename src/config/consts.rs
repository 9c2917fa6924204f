/// Lower bound on the default worker pool. Elements hold a worker while they
/// await, so sizing by core count alone starves frames behind sleeping ones.
pub const MIN_DEFAULT_CONCURRENCY: usize = 16;
/// Default idle-expiry for streams that don't specify a grace time (seconds)
pub const DEFAULT_GRACE_TIME_SECS: u64 = 300;
/// How often the event loop looks for idle streams (milliseconds)
pub const DEFAULT_EXPIRY_CHECK_MS: u64 = 1_000;
/// Default window a request/response caller waits for a frame result (seconds)
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 10;
/// Parameter that marks an element as a dynamic branch target
pub const DEFAULT_BRANCH_SELECTOR: &str = "option";
/// Class name of the routing element whose `selector` parameter overrides the marker
pub const SELECT_CLASS_NAME: &str = "select";
/// Parameter that advertises an element as an externally callable tool
pub const TOOL_PARAMETER: &str = "tool";
/// Swag key carrying an element's error message
pub const DIAGNOSTIC_KEY: &str = "diagnostic";
