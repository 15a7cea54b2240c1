//! Domain event plumbing shared by aggregates.

pub mod event;
pub mod handler;

pub use event::Event;
pub use handler::execute;
