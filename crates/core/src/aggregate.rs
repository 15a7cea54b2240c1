//! Records the application owns (bundles) are aggregates: commands are
//! decided against current state, the resulting events evolve it.

/// An identified record with a version counter.
pub trait AggregateRoot {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Events applied since the record was created.
    fn version(&self) -> u64;
}

/// Version a save expects the stored record to be at.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Last write wins.
    Any,
    /// Absent records count as version 0.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, stored: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == stored,
        }
    }
}

/// Pure command handling.
///
/// `handle` decides without mutating; `apply` evolves state by one event and
/// bumps the version. Neither talks to the platform or to storage.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
