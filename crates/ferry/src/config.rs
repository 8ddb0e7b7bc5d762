use std::borrow::Cow;
use tracing::Level;

const DEFAULT_NOT_FOUND_BODY: &str = "Check URL";
const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Server wide settings shared by every request.
///
/// ```
/// use ferry::Config;
/// use tracing::Level;
///
/// let config = Config::default()
///     .with_validation(false)
///     .with_max_body_size(64 * 1024)
///     .with_log_level(Some(Level::DEBUG));
///
/// assert!(!config.validation());
/// assert_eq!(config.not_found_body(), "Check URL");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    validation: bool,
    not_found_body: Cow<'static, str>,
    max_body_size: usize,
    log_level: Option<Level>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            validation: true,
            not_found_body: Cow::Borrowed(DEFAULT_NOT_FOUND_BODY),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            log_level: Some(Level::INFO),
        }
    }
}

impl Config {
    /// Whether [`Context::bind`](crate::Context::bind) runs [`Validate`](crate::Validate).
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validation = enabled;
        self
    }

    /// Body of every 404 response.
    pub fn with_not_found_body(mut self, body: impl Into<Cow<'static, str>>) -> Self {
        self.not_found_body = body.into();
        self
    }

    /// Upper bound for bodies read by the binding and upload helpers.
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Level of the `tracing` subscriber installed by [`Ferry::listen`](crate::Ferry::listen),
    /// `None` leaves subscriber setup to the application.
    pub fn with_log_level(mut self, level: Option<Level>) -> Self {
        self.log_level = level;
        self
    }

    pub fn validation(&self) -> bool {
        self.validation
    }

    pub fn not_found_body(&self) -> &str {
        &self.not_found_body
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub fn log_level(&self) -> Option<Level> {
        self.log_level
    }
}
