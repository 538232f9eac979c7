// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Expiration policy for stored entries.

use std::time::Duration;

/// How long a stored entry lives.
///
/// Integer seconds follow the three-state convention shared by every backend: a negative value
/// asks the backend for its configured default, zero means the entry never expires and a
/// positive value expires the entry after that many seconds.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tiercache_core::Ttl;
///
/// assert_eq!(Ttl::from_seconds(-1), Ttl::Default);
/// assert_eq!(Ttl::from_seconds(0), Ttl::Never);
/// assert_eq!(Ttl::from_seconds(30), Ttl::After(Duration::from_secs(30)));
///
/// // A backend configured with a five minute default.
/// let default = Some(Duration::from_secs(300));
/// assert_eq!(Ttl::Default.expiry(default), default);
/// assert_eq!(Ttl::Never.expiry(default), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ttl {
    /// Use the backend's configured default.
    #[default]
    Default,
    /// Never expire.
    Never,
    /// Expire after the given duration.
    After(Duration),
}

impl Ttl {
    /// Converts integer seconds using the negative/zero/positive convention.
    #[must_use]
    pub fn from_seconds(seconds: i64) -> Self {
        match seconds {
            s if s < 0 => Self::Default,
            0 => Self::Never,
            s => Self::After(Duration::from_secs(s.unsigned_abs())),
        }
    }

    /// Resolves this policy against a backend default.
    ///
    /// Returns `None` when the entry should never expire.
    #[must_use]
    pub fn expiry(self, default: Option<Duration>) -> Option<Duration> {
        match self {
            Self::Default => default.filter(|d| !d.is_zero()),
            Self::Never => None,
            Self::After(d) if d.is_zero() => None,
            Self::After(d) => Some(d),
        }
    }
}

impl From<i64> for Ttl {
    fn from(seconds: i64) -> Self {
        Self::from_seconds(seconds)
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        if duration.is_zero() { Self::Never } else { Self::After(duration) }
    }
}

/// Converts a configured default in seconds, where `0` means "never expire".
#[must_use]
pub fn default_from_seconds(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_follow_sign_convention() {
        assert_eq!(Ttl::from(-5), Ttl::Default);
        assert_eq!(Ttl::from(0), Ttl::Never);
        assert_eq!(Ttl::from(1), Ttl::After(Duration::from_secs(1)));
    }

    #[test]
    fn default_resolves_to_backend_setting() {
        assert_eq!(Ttl::Default.expiry(None), None);
        assert_eq!(Ttl::Default.expiry(Some(Duration::ZERO)), None);
        assert_eq!(
            Ttl::Default.expiry(Some(Duration::from_secs(9))),
            Some(Duration::from_secs(9))
        );
    }

    #[test]
    fn explicit_values_ignore_backend_setting() {
        let default = Some(Duration::from_secs(9));
        assert_eq!(Ttl::Never.expiry(default), None);
        assert_eq!(
            Ttl::After(Duration::from_secs(2)).expiry(default),
            Some(Duration::from_secs(2))
        );
        assert_eq!(Ttl::After(Duration::ZERO).expiry(default), None);
    }

    #[test]
    fn zero_duration_never_expires() {
        assert_eq!(Ttl::from(Duration::ZERO), Ttl::Never);
        assert_eq!(Ttl::from(Duration::from_millis(10)), Ttl::After(Duration::from_millis(10)));
    }

    #[test]
    fn configured_default_of_zero_never_expires() {
        assert_eq!(default_from_seconds(0), None);
        assert_eq!(default_from_seconds(60), Some(Duration::from_secs(60)));
    }
}
