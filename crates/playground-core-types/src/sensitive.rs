//! Sensitive data marker for automatic redaction
//!
//! The `Sensitive<T>` wrapper keeps values such as database connection
//! strings out of log output and `Debug` dumps of the configuration.

use std::fmt;

/// Wrapper for sensitive data that redacts itself in Debug and Display
///
/// # Example
///
/// ```
/// use playground_core_types::Sensitive;
///
/// let url = Sensitive::new("postgres://user:hunter2@db/playground");
/// assert_eq!(format!("{:?}", url), "***REDACTED***");
/// assert_eq!(format!("{}", url), "***REDACTED***");
///
/// assert_eq!(url.expose(), &"postgres://user:hunter2@db/playground");
/// ```
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the underlying value
    ///
    /// Only call this where the raw value is actually consumed (e.g. when
    /// opening the database), never when formatting for output.
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume the wrapper and return the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T: Clone> Clone for Sensitive<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> From<T> for Sensitive<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_debug_redaction() {
        let secret = Sensitive::new("sqlite:///var/lib/playground.db");
        let debug_str = format!("{:?}", secret);
        assert_eq!(debug_str, "***REDACTED***");
        assert!(!debug_str.contains("playground.db"));
    }

    #[test]
    fn test_sensitive_display_redaction() {
        let secret = Sensitive::new("postgres://admin:pw@localhost");
        assert_eq!(format!("{}", secret), "***REDACTED***");
    }

    #[test]
    fn test_sensitive_into_inner() {
        let secret = Sensitive::new(String::from("test"));
        assert_eq!(secret.into_inner(), "test");
    }

    #[test]
    fn test_sensitive_inside_config_struct() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct Config {
            port: u16,
            database_url: Sensitive<String>,
        }

        let config = Config {
            port: 8000,
            database_url: Sensitive::from("sqlite://secret-path.db".to_string()),
        };

        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("8000"));
        assert!(debug_str.contains("***REDACTED***"));
        assert!(!debug_str.contains("secret-path"));
    }
}
