//! A writer-preference, starvation-free reader/writer lock.
//!
//! Ports the three-mutex construction used by the original store's `RWLock`
//! class: a `writer_lock` gate that every reader must pass through before
//! joining the reader group, a `reader_counter_lock` serializing updates to
//! the live reader count, and a `readwrite_lock` held by the first reader in
//! and released by the last reader out, or held directly by a writer. A
//! waiting writer blocks on `writer_lock` before any new reader can enter,
//! so writers cannot be starved by a continuous stream of readers.
//!
//! Unlike a general-purpose `RwLock`, this type owns the protected data
//! directly (`FairRwLock<T>`) and hands out `ReadGuard`/`WriteGuard` smart
//! pointers, the same shape as [`parking_lot::RwLock`], so callers never see
//! the underlying `enter_reader`/`leave_reader`/`enter_writer`/`leave_writer`
//! primitives directly.

use parking_lot::RawMutex;
use parking_lot::lock_api::RawMutex as _;
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct FairRwLock<T> {
    writer_lock: RawMutex,
    reader_counter_lock: RawMutex,
    readwrite_lock: RawMutex,
    reader_count: AtomicUsize,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is always mediated by the three raw mutexes
// above; `ReadGuard` only ever hands out `&T`, `WriteGuard` only ever hands
// out one live `&mut T` at a time.
unsafe impl<T: Send> Send for FairRwLock<T> {}
unsafe impl<T: Send> Sync for FairRwLock<T> {}

impl<T> FairRwLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            writer_lock: RawMutex::INIT,
            reader_counter_lock: RawMutex::INIT,
            readwrite_lock: RawMutex::INIT,
            reader_count: AtomicUsize::new(0),
            data: UnsafeCell::new(value),
        }
    }

    /// Joins the reader group. Blocks if a writer holds `readwrite_lock`,
    /// or if a writer is queued behind `writer_lock`.
    pub fn read(&self) -> ReadGuard<'_, T> {
        unsafe {
            self.writer_lock.lock();
            self.reader_counter_lock.lock();
            if self.reader_count.load(Ordering::Relaxed) == 0 {
                self.readwrite_lock.lock();
            }
            self.reader_count.fetch_add(1, Ordering::Relaxed);
            self.reader_counter_lock.unlock();
            self.writer_lock.unlock();
        }
        ReadGuard { lock: self }
    }

    /// Takes exclusive access. Blocks until every current reader has left
    /// and no other writer holds the lock.
    pub fn write(&self) -> WriteGuard<'_, T> {
        unsafe {
            self.writer_lock.lock();
            self.readwrite_lock.lock();
        }
        WriteGuard { lock: self }
    }
}

pub struct ReadGuard<'a, T> {
    lock: &'a FairRwLock<T>,
}

impl<'a, T> Deref for ReadGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T> Drop for ReadGuard<'a, T> {
    fn drop(&mut self) {
        unsafe {
            self.lock.reader_counter_lock.lock();
            let remaining = self.lock.reader_count.fetch_sub(1, Ordering::Relaxed) - 1;
            if remaining == 0 {
                self.lock.readwrite_lock.unlock();
            }
            self.lock.reader_counter_lock.unlock();
        }
    }
}

pub struct WriteGuard<'a, T> {
    lock: &'a FairRwLock<T>,
}

impl<'a, T> Deref for WriteGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T> DerefMut for WriteGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T> Drop for WriteGuard<'a, T> {
    fn drop(&mut self) {
        unsafe {
            self.lock.readwrite_lock.unlock();
            self.lock.writer_lock.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicU64;
    use std::thread;

    #[test]
    fn single_writer_sees_consistent_total() {
        let lock = Arc::new(FairRwLock::new(0u64));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = Arc::clone(&lock);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    *lock.write() += 1;
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.read(), 8000);
    }

    #[test]
    fn concurrent_readers_do_not_block_each_other() {
        let lock = Arc::new(FairRwLock::new(42u64));
        let seen = Arc::new(AtomicU64::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = Arc::clone(&lock);
            let seen = Arc::clone(&seen);
            handles.push(thread::spawn(move || {
                let guard = lock.read();
                seen.fetch_add(*guard, Ordering::Relaxed);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(seen.load(Ordering::Relaxed), 42 * 8);
    }

    #[test]
    fn writer_excludes_readers() {
        let lock = FairRwLock::new(vec![1, 2, 3]);
        {
            let mut guard = lock.write();
            guard.push(4);
        }
        assert_eq!(*lock.read(), vec![1, 2, 3, 4]);
    }
}
