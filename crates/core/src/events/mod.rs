//! Domain events and the change feed that turns them into live-query
//! notifications.

mod change_feed;
mod domain_event;

pub use change_feed::*;
pub use domain_event::*;
