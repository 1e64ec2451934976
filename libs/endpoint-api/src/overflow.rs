/// Behavior when a bounded channel between a blocking transport thread and
/// its async consumer is full. Carried over unchanged from the teacher's
/// `server-api::OverflowPolicy` (`libs/api/src/types.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the new item and log, via `try_send`.
    Drop,
    /// Block the producer thread until there is room, via `blocking_send`.
    #[serde(alias = "backpressure")]
    BackPressure,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::BackPressure
    }
}
