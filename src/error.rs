//! Unified error type for the appliance.
//!
//! Each fallible subsystem defines its own error enum; this type wraps
//! them so the state loop and the binary boundary deal with one thing.

/// Top-level error type used across the application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration file could not be read or parsed.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// OAuth device flow or token refresh failed.
    #[error(transparent)]
    Auth(#[from] crate::auth::AuthError),

    /// Weather provider call failed.
    #[error(transparent)]
    Weather(#[from] crate::weather::WeatherError),

    /// Calendar provider call failed.
    #[error(transparent)]
    Calendar(#[from] crate::calendar::CalendarError),

    /// Framebuffer device could not be opened or flushed.
    #[error(transparent)]
    Panel(#[from] crate::panel::PanelError),

    /// Touch device could not be opened.
    #[error(transparent)]
    Touch(#[from] crate::touch::TouchError),
}

// Drawing into the shadow framebuffer cannot fail; this lets view code
// use `?` against the common DrawTarget signature anyway.
impl From<core::convert::Infallible> for Error {
    fn from(err: core::convert::Infallible) -> Self {
        match err {}
    }
}
