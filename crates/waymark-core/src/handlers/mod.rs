//! Collaborators the router calls into
//!
//! Exception handlers get the first chance at request-time errors; event
//! handlers observe the dispatch lifecycle.

pub mod event;
pub mod exception;

pub use event::{Event, EventArgument, EventHandler, EventListeners};
pub use exception::{CallbackExceptionHandler, ExceptionHandler};
