//! Notification gate: decides whether a run should notify, and composes
//! what it would say. Delivery belongs to the mail transports.

pub mod gate;
pub mod recipients;

pub use gate::{decide, NotificationEvent, NotifyMode};
pub use recipients::Recipients;
