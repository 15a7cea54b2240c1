use chrono::{DateTime, Utc};

/// Something that happened to a bundle record.
///
/// Named with a stable dotted type such as `bundles.bundle.synced`.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn event_type(&self) -> &'static str;

    /// Payload schema version of this event type.
    fn version(&self) -> u32;

    fn occurred_at(&self) -> DateTime<Utc>;
}
