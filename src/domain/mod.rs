pub mod event;
pub mod snapshot;

pub use event::RawEvent;
pub use snapshot::{
    ConnectionState, DashboardSnapshot, Notification, ProcessedEmailRecord, RECENT_EVENTS_CAP,
    Stats,
};
