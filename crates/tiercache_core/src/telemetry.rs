// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logging for cache operations.
//!
//! Every backend and composite reports what happened to an operation through [`record`], which
//! emits a single `tracing` event named `cache.event` with `cache.name`, `cache.operation` and
//! `cache.activity` fields. The level follows the activity's [`Severity`]: lookups log at
//! debug, state changes at info, unsupported operations at warn and failures at error.

/// Field name for the cache instance.
pub const CACHE_NAME: &str = "cache.name";

/// Field name for the operation.
pub const CACHE_OPERATION_NAME: &str = "cache.operation";

/// Field name for the activity.
pub const CACHE_ACTIVITY_NAME: &str = "cache.activity";

/// Message of every emitted event.
pub const CACHE_EVENT_NAME: &str = "cache.event";

/// The operation being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOperation {
    /// [`crate::Cache::set`]
    Set,
    /// [`crate::Cache::get`]
    Get,
    /// [`crate::Cache::delete`]
    Delete,
    /// [`crate::Cache::exists`]
    Exists,
    /// [`crate::Cache::flush`]
    Flush,
    /// [`crate::Cache::is_ready`]
    Ready,
    /// [`crate::Cache::close`]
    Close,
}

impl CacheOperation {
    /// Returns the field value logged for this operation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Set => "cache.set",
            Self::Get => "cache.get",
            Self::Delete => "cache.delete",
            Self::Exists => "cache.exists",
            Self::Flush => "cache.flush",
            Self::Ready => "cache.ready",
            Self::Close => "cache.close",
        }
    }
}

/// What happened during an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheActivity {
    /// A lookup found a value.
    Hit,
    /// A lookup found nothing.
    Miss,
    /// A value was written.
    Stored,
    /// An entry was removed.
    Removed,
    /// All entries were removed.
    Flushed,
    /// A value found in a lower tier was copied into faster tiers.
    Promoted,
    /// The backend does not implement the operation.
    NotSupported,
    /// The operation completed with nothing further to report.
    Ok,
    /// The operation failed.
    Error,
}

impl CacheActivity {
    /// Returns the field value logged for this activity.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Stored => "cache.stored",
            Self::Removed => "cache.removed",
            Self::Flushed => "cache.flushed",
            Self::Promoted => "cache.promoted",
            Self::NotSupported => "cache.not_supported",
            Self::Ok => "cache.ok",
            Self::Error => "cache.error",
        }
    }

    /// Returns the level this activity is logged at.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::Miss | Self::Ok => Severity::Debug,
            Self::Stored | Self::Removed | Self::Flushed | Self::Promoted => Severity::Info,
            Self::NotSupported => Severity::Warn,
            Self::Error => Severity::Error,
        }
    }
}

/// Log level of a cache event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine lookups.
    Debug,
    /// State changes.
    Info,
    /// Expected but noteworthy outcomes.
    Warn,
    /// Failures.
    Error,
}

/// Emits a `cache.event` for one operation of the cache named `cache_name`.
pub fn record(cache_name: &str, operation: CacheOperation, activity: CacheActivity) {
    let op = operation.as_str();
    let ev = activity.as_str();

    // Tracing level must be constant, so we use a macro to select the appropriate level.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(cache.name = cache_name, cache.operation = op, cache.activity = ev, "cache.event")
        };
    }

    match activity.severity() {
        Severity::Error => emit_event!(error),
        Severity::Warn => emit_event!(warn),
        Severity::Info => emit_event!(info),
        Severity::Debug => emit_event!(debug),
    }
}

/// Records the outcome of a fallible operation: `activity` on success, an error event on failure.
pub fn record_result<T>(cache_name: &str, operation: CacheOperation, result: &crate::Result<T>, activity: impl FnOnce(&T) -> CacheActivity) {
    let activity = match result {
        Ok(value) => activity(value),
        Err(error) if error.is_not_supported() => CacheActivity::NotSupported,
        Err(_) => CacheActivity::Error,
    };
    record(cache_name, operation, activity);
}
