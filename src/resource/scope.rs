//! Scoped resource acquisition with guaranteed reverse-order release.
//!
//! A [`ResourceScope`] collects teardown actions as resources are acquired and
//! runs them in strict reverse order when the scope exits, whether the body
//! completed or failed partway through. Teardown failures are surfaced in
//! addition to an in-flight error, never instead of it.

use crate::core::errors::{HarnessError, Result};

type Teardown = Box<dyn FnOnce() -> Result<()>>;

/// An open scope of acquired resources awaiting release.
#[derive(Default)]
pub struct ResourceScope {
    teardowns: Vec<Teardown>,
}

impl ResourceScope {
    /// Register a teardown to run when the scope exits.
    ///
    /// Registration order is acquisition order; release happens in reverse,
    /// so a resource depending on an earlier one is always torn down first.
    pub fn defer(&mut self, teardown: impl FnOnce() -> Result<()> + 'static) {
        self.teardowns.push(Box::new(teardown));
    }

    fn release_all(&mut self) -> Option<HarnessError> {
        let mut failure: Option<HarnessError> = None;
        while let Some(teardown) = self.teardowns.pop() {
            if let Err(e) = teardown() {
                failure = Some(match failure {
                    None => e,
                    Some(earlier) => HarnessError::during_cleanup(earlier, e),
                });
            }
        }
        failure
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        // Reached only when unwinding past `run_scope` (a panic in the body):
        // release remaining resources best-effort, errors have nowhere to go.
        while let Some(teardown) = self.teardowns.pop() {
            let _ = teardown();
        }
    }
}

/// Run `body` inside a fresh scope, releasing everything it acquired.
///
/// Combination rules on exit:
/// - body ok, all teardowns ok → the body's value;
/// - body ok, a teardown failed → the teardown error;
/// - body failed, teardowns ok → the body error;
/// - both failed → [`HarnessError::Cleanup`] carrying both.
pub fn run_scope<R>(body: impl FnOnce(&mut ResourceScope) -> Result<R>) -> Result<R> {
    let mut scope = ResourceScope::default();
    let outcome = body(&mut scope);
    let cleanup = scope.release_all();
    match (outcome, cleanup) {
        (Ok(value), None) => Ok(value),
        (Ok(_), Some(e)) => Err(e),
        (Err(e), None) => Err(e),
        (Err(primary), Some(cleanup)) => Err(HarnessError::during_cleanup(primary, cleanup)),
    }
}
