//! Smart-mirror appliance: clock, current weather, and a touch-navigable
//! Google Calendar month on a Linux framebuffer panel.

pub mod auth;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod panel;
pub mod state;
pub mod touch;
pub mod weather;

pub use error::Error;
