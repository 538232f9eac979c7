// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The miss-loader protocol.

use std::fmt;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::{Error, Result};

/// A caller-supplied fallback that runs when a lookup does not resolve a value.
///
/// A loader is a deferred, single-shot computation. Constructing one does nothing; the closure
/// only runs when a cache awaits [`MissLoader::invoke`], which consumes the loader. Its result
/// becomes the result of the `get` call verbatim, so a loader usually populates the cache and
/// returns `Ok(())`, or reports a failure.
///
/// # Examples
///
/// ```
/// use tiercache_core::{Error, MissLoader};
///
/// # futures::executor::block_on(async {
/// let mut loads = 0;
/// let counter = &mut loads;
/// let loader = MissLoader::new(move || async move {
///     *counter += 1;
///     Ok(())
/// });
/// loader.invoke().await?;
/// assert_eq!(loads, 1);
///
/// let failing = MissLoader::fail(Error::miss_triggered("not in the database"));
/// assert!(failing.invoke().await.is_err());
/// # Ok::<(), Error>(())
/// # }).unwrap();
/// ```
pub struct MissLoader<'a>(BoxFuture<'a, Result<()>>);

impl<'a> MissLoader<'a> {
    /// Creates a loader from a closure producing the load future.
    pub fn new<F, Fut>(load: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<()>> + Send + 'a,
    {
        Self(async move { load().await }.boxed())
    }

    /// Creates a loader that reports `error` when invoked.
    #[must_use]
    pub fn fail(error: Error) -> Self {
        Self(futures::future::ready(Err(error)).boxed())
    }

    /// Runs the loader.
    pub async fn invoke(self) -> Result<()> {
        self.0.await
    }
}

impl fmt::Debug for MissLoader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MissLoader").finish_non_exhaustive()
    }
}

/// Completes a miss: invokes the loader when one was supplied, otherwise succeeds.
pub async fn on_miss(loader: Option<MissLoader<'_>>) -> Result<()> {
    match loader {
        Some(loader) => loader.invoke().await,
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn loader_is_lazy() {
        let mut ran = false;
        let flag = &mut ran;
        let loader = MissLoader::new(move || async move {
            *flag = true;
            Ok(())
        });
        drop(loader);
        assert!(!ran);
    }

    #[test]
    fn on_miss_without_loader_succeeds() {
        block_on(on_miss(None)).expect("no loader should succeed");
    }

    #[test]
    fn on_miss_returns_loader_result_verbatim() {
        let err = block_on(on_miss(Some(MissLoader::fail(Error::miss_triggered("boom"))))).expect_err("loader error expected");
        assert_eq!(err.kind(), ErrorKind::MissTriggered);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn debug_hides_the_future() {
        let loader = MissLoader::new(|| async { Ok(()) });
        assert_eq!(format!("{loader:?}"), "MissLoader { .. }");
    }
}
