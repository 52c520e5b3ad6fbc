//! Panic isolation for user callbacks
//!
//! Subscriber and listener callbacks run inside `catch_unwind` so a
//! panicking callback is logged and the remaining callbacks still run.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run `f`, containing any panic. Returns `false` if `f` panicked.
pub(crate) fn run_guarded<F: FnOnce()>(label: &str, f: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            tracing::error!("{} panicked: {}", label, panic_message(payload.as_ref()));
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_contains_panic() {
        assert!(run_guarded("ok", || {}));
        assert!(!run_guarded("boom", || panic!("subscriber failed")));
    }
}
