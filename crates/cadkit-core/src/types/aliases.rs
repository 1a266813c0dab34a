//! Type aliases for commonly used shared-state and callback types.
//!
//! Factories keep the state a detached preview task must update behind
//! `Arc<Mutex<T>>`; these aliases name that pattern once.
//!
//! ```rust,ignore
//! use cadkit_core::types::*;
//!
//! // Instead of: Arc<parking_lot::Mutex<LifecycleState>>
//! let state: ThreadSafe<LifecycleState> = thread_safe(LifecycleState::default());
//! ```

use parking_lot::Mutex;
use std::sync::Arc;

// =============================================================================
// THREAD-SAFE SHARED TYPES
// =============================================================================

/// A thread-safe, mutex-protected wrapper for cross-task sharing.
///
/// Uses `parking_lot::Mutex`; guards must never be held across an `.await`.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

// =============================================================================
// CALLBACK TYPES
// =============================================================================

/// Cleanup callback run exactly once when a factory is disposed.
pub type Disposer = Box<dyn FnOnce() + Send>;

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Create a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_safe_shares_value() {
        let state = thread_safe(1);
        let clone = state.clone();
        *clone.lock() += 1;
        assert_eq!(*state.lock(), 2);
    }
}
