//! View-state holders.
//!
//! Each holder owns an immutable UI snapshot published through a
//! `tokio::sync::watch` channel and translates user actions into service
//! calls. Live updates re-run the holder's queries whenever the change feed
//! reports a commit.

mod expense_form;
mod expense_view_model;
mod live;
mod reports_view_model;


pub use expense_form::*;
pub use expense_view_model::{ExpenseUiState, ExpenseViewModel};
pub use live::LiveUpdates;
pub use reports_view_model::{ReportsUiState, ReportsViewModel};
