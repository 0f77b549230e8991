//! Client-facing HTTP listener and per-request dispatch.

mod dispatcher;
mod listener;

pub use dispatcher::Dispatcher;
pub use listener::FrontendListener;
