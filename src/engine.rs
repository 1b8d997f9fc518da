//! Process-wide collaborator handles
//!
//! Model clients are expensive to build and safe to share, so each one lives
//! behind a [`Shared`] handle: built on first use, at most once, and then
//! handed out by reference to every request.

use std::fmt;

use tokio::sync::OnceCell;

use crate::Result;

type Init<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

/// Lazily-initialised, initialise-once handle to a collaborator
///
/// Concurrent first calls race on the same cell; exactly one initialiser runs
/// to completion and every caller observes its value. A failed initialisation
/// leaves the cell empty so the next call retries.
pub struct Shared<T> {
    name: &'static str,
    cell: OnceCell<T>,
    init: Init<T>,
}

impl<T> Shared<T> {
    /// Create a handle that builds its value with `init` on first access
    pub fn new(name: &'static str, init: impl Fn() -> Result<T> + Send + Sync + 'static) -> Self {
        Self {
            name,
            cell: OnceCell::new(),
            init: Box::new(init),
        }
    }

    /// Create a handle that is already initialised
    pub fn ready(name: &'static str, value: T) -> Self {
        Self {
            name,
            cell: OnceCell::new_with(Some(value)),
            init: Box::new(move || {
                Err(crate::Error::Config(format!("{name} handle cannot be rebuilt")))
            }),
        }
    }

    /// Get the value, initialising it if this is the first access
    ///
    /// # Errors
    ///
    /// Returns the initialiser's error; the next call will try again
    pub async fn get(&self) -> Result<&T> {
        self.cell
            .get_or_try_init(|| async {
                tracing::info!(handle = self.name, "initialising collaborator");
                (self.init)()
            })
            .await
    }

    /// Whether the value has been built yet
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("name", &self.name)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[tokio::test]
    async fn initialises_once_under_concurrency() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let shared = Arc::new(Shared::new("counter", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(42_u32)
        }));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let handle = shared.clone();
            tasks.push(tokio::spawn(async move { *handle.get().await.unwrap() }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(shared.is_initialized());
    }

    #[tokio::test]
    async fn failed_init_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let shared = Shared::new("flaky", move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(crate::Error::Config("not yet".to_string()))
            } else {
                Ok("ready")
            }
        });

        assert_err!(shared.get().await);
        assert!(!shared.is_initialized());
        assert_eq!(*assert_ok!(shared.get().await), "ready");
    }

    #[tokio::test]
    async fn ready_handle_skips_init() {
        let shared = Shared::ready("preset", 7_u8);
        assert!(shared.is_initialized());
        assert_eq!(*shared.get().await.unwrap(), 7);
    }
}
