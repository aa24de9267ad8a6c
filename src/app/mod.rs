//! Session controller, application state and presentation.

pub mod controller;
pub mod render;
pub mod state;
pub mod store;

pub use controller::Controller;
pub use render::{ConsoleRenderer, Renderer};
pub use state::{AppState, Event, reduce};
pub use store::SessionStore;
