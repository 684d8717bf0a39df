//! Free lists for scratch objects reused across block evaluations.
//!
//! Objects are cleared when they go back to the pool, not when they are taken
//! out, so [`Pool::acquire`] only promises a value in its cleared state.
//! [`Pooled`] returns the value on drop, covering early returns and unwinding.

use std::{
    collections::HashSet,
    fmt,
    ops::{Deref, DerefMut},
};

use parking_lot::Mutex;

/// Default number of idle objects retained per pool.
pub const DEFAULT_MAX_IDLE: usize = 256;

/// Values that can be cleared and handed out again.
pub trait Reusable: Default + Send {
    /// Drop the contents while keeping allocated capacity.
    fn clear_for_reuse(&mut self);
}

impl Reusable for String {
    fn clear_for_reuse(&mut self) {
        self.clear();
    }
}

impl<T: Send> Reusable for Vec<T> {
    fn clear_for_reuse(&mut self) {
        self.clear();
    }
}

impl<T: Send> Reusable for HashSet<T> {
    fn clear_for_reuse(&mut self) {
        self.clear();
    }
}

/// Bounded free list of reusable objects.
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    max_idle: usize,
}

impl<T: Reusable> Pool<T> {
    /// Create a pool retaining at most `max_idle` released objects.
    pub fn new(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Take an object from the pool, allocating a fresh one when the pool is empty.
    pub fn acquire(&self) -> Pooled<'_, T> {
        let value = self.free.lock().pop().unwrap_or_default();
        Pooled { pool: self, value }
    }

    /// Number of released objects waiting for reuse.
    pub fn idle_len(&self) -> usize {
        self.free.lock().len()
    }

    fn release(&self, mut value: T) {
        value.clear_for_reuse();
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(value);
        }
    }
}

impl<T: Reusable> Default for Pool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("idle", &self.free.lock().len())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Scoped handle to a pooled object; the object returns to its pool on drop.
pub struct Pooled<'p, T: Reusable> {
    pool: &'p Pool<T>,
    value: T,
}

impl<T: Reusable> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Reusable> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Reusable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        let value = std::mem::take(&mut self.value);
        self.pool.release(value);
    }
}

impl<T: Reusable + fmt::Debug> fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_clears_and_reuses_capacity() {
        let pool: Pool<String> = Pool::new(4);
        {
            let mut buf = pool.acquire();
            buf.push_str("some scratch text");
            assert_eq!(pool.idle_len(), 0);
        }
        assert_eq!(pool.idle_len(), 1);

        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= "some scratch text".len());
    }

    #[test]
    fn idle_objects_are_bounded() {
        let pool: Pool<Vec<u8>> = Pool::new(2);
        let held: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        drop(held);
        assert_eq!(pool.idle_len(), 2);
    }

    #[test]
    fn release_happens_on_unwind() {
        let pool: Pool<Vec<u64>> = Pool::new(4);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut v = pool.acquire();
            v.push(7);
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(pool.idle_len(), 1);
        assert!(pool.acquire().is_empty());
    }
}
