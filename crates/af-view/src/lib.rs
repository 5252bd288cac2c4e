//! # af-view
//!
//! The forum's view/data state machine and the controller that feeds it.

pub mod controller;
pub mod events;
pub mod state;

pub use controller::{ForumController, ForumPorts, SubmitOutcome};
pub use events::{ForumEvent, Notification, Severity};
pub use state::{
    DetailView, ForumSnapshot, ForumState, ListView, Loadable, ReplyComposer, ThreadComposer,
    ViewMode,
};
