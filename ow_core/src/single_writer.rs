//! A cell for buffers that are, by construction, mutated from exactly one
//! thread at a time (though which thread that is may change between engine
//! sessions). Spec §5 assigns each scratch buffer to a single owning
//! callback; this type makes that invariant explicit instead of reaching
//! for a lock no data race actually requires.

use std::cell::UnsafeCell;

pub struct SingleWriter<T>(UnsafeCell<T>);

// SAFETY: callers uphold the single-writer-at-a-time invariant documented
// on each field that uses this type (see `engine.rs`); no two threads ever
// call `with_mut` concurrently on the same instance.
unsafe impl<T: Send> Send for SingleWriter<T> {}
unsafe impl<T: Send> Sync for SingleWriter<T> {}

impl<T> SingleWriter<T> {
    pub fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// Run `f` with exclusive access to the inner value.
    ///
    /// # Safety
    /// The caller must ensure no other thread is concurrently inside
    /// `with_mut` on the same instance.
    #[inline]
    pub unsafe fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(unsafe { &mut *self.0.get() })
    }
}
