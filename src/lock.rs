//! Reentrant reader/writer lock with an upgradeable mode
//!
//! Three access modes:
//! - shared: any number of holders
//! - upgradeable: a single holder, compatible with shared holders, that may
//!   later be promoted to exclusive without releasing
//! - exclusive: a single holder and nobody else
//!
//! Every mode is reentrant for the thread that holds it, and a thread that
//! holds upgradeable or exclusive access may take any weaker mode again.
//! A thread that holds *only* shared access cannot ask for upgradeable or
//! exclusive access: two such threads would wait on each other forever, so
//! the request fails instead.

use crate::error::{PackageError, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct LockState {
    readers: HashMap<ThreadId, usize>,
    upgradeable: Option<(ThreadId, usize)>,
    writer: Option<(ThreadId, usize)>,
    /// Threads waiting for exclusive access; new readers queue behind them
    pending_writers: usize,
}

impl LockState {
    fn is_writer(&self, me: ThreadId) -> bool {
        matches!(self.writer, Some((owner, _)) if owner == me)
    }

    fn is_upgradeable(&self, me: ThreadId) -> bool {
        matches!(self.upgradeable, Some((owner, _)) if owner == me)
    }

    fn is_reader(&self, me: ThreadId) -> bool {
        self.readers.contains_key(&me)
    }

    fn other_readers(&self, me: ThreadId) -> usize {
        self.readers
            .iter()
            .filter(|(owner, _)| **owner != me)
            .map(|(_, count)| *count)
            .sum()
    }

    fn can_write(&self, me: ThreadId) -> bool {
        self.writer.is_none()
            && self.other_readers(me) == 0
            && (self.upgradeable.is_none() || self.is_upgradeable(me))
    }
}

fn shared_only_error() -> PackageError {
    PackageError::InternalInconsistency(
        "thread holding only shared access requested a stronger lock mode".to_string(),
    )
}

/// Reentrant upgradeable reader/writer lock
#[derive(Debug, Default)]
pub struct ReentrantRwLock {
    state: Mutex<LockState>,
    changed: Condvar,
}

impl ReentrantRwLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take shared access
    pub fn read(&self) -> ReadGuard<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        let reentrant = state.is_reader(me) || state.is_upgradeable(me) || state.is_writer(me);
        if !reentrant {
            while state.writer.is_some() || state.pending_writers > 0 {
                self.changed.wait(&mut state);
            }
        }

        *state.readers.entry(me).or_insert(0) += 1;
        ReadGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Take upgradeable access
    pub fn upgradeable(&self) -> Result<UpgradeableGuard<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if let Some((owner, count)) = state.upgradeable.as_mut() {
            if *owner == me {
                *count += 1;
                return Ok(UpgradeableGuard {
                    lock: self,
                    _not_send: PhantomData,
                });
            }
        }

        if !state.is_writer(me) {
            if state.is_reader(me) {
                return Err(shared_only_error());
            }
            while state.upgradeable.is_some() || state.writer.is_some() {
                self.changed.wait(&mut state);
            }
        }

        // Either free, or held by this thread as writer, in which case
        // nobody else can hold the upgradeable slot
        state.upgradeable = Some((me, 1));
        Ok(UpgradeableGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Take exclusive access
    pub fn write(&self) -> Result<WriteGuard<'_>> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if let Some((owner, count)) = state.writer.as_mut() {
            if *owner == me {
                *count += 1;
                return Ok(WriteGuard {
                    lock: self,
                    _not_send: PhantomData,
                });
            }
        }

        if state.is_reader(me) && !state.is_upgradeable(me) {
            return Err(shared_only_error());
        }

        state.pending_writers += 1;
        while !state.can_write(me) {
            self.changed.wait(&mut state);
        }
        state.pending_writers -= 1;

        state.writer = Some((me, 1));
        Ok(WriteGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Whether the calling thread holds exclusive access
    pub fn is_write_held(&self) -> bool {
        self.state.lock().is_writer(thread::current().id())
    }

    fn release_read(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if let Some(count) = state.readers.get_mut(&me) {
            *count -= 1;
            if *count == 0 {
                state.readers.remove(&me);
            }
        }
        drop(state);
        self.changed.notify_all();
    }

    fn release_upgradeable(&self) {
        let mut state = self.state.lock();
        if let Some((_, count)) = state.upgradeable.as_mut() {
            *count -= 1;
            if *count == 0 {
                state.upgradeable = None;
            }
        }
        drop(state);
        self.changed.notify_all();
    }

    fn release_write(&self) {
        let mut state = self.state.lock();
        if let Some((_, count)) = state.writer.as_mut() {
            *count -= 1;
            if *count == 0 {
                state.writer = None;
            }
        }
        drop(state);
        self.changed.notify_all();
    }
}

/// Shared access; released on drop
pub struct ReadGuard<'a> {
    lock: &'a ReentrantRwLock,
    // Guards must be released by the thread that took them
    _not_send: PhantomData<*const ()>,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

/// Upgradeable access; released on drop
pub struct UpgradeableGuard<'a> {
    lock: &'a ReentrantRwLock,
    _not_send: PhantomData<*const ()>,
}

impl<'a> UpgradeableGuard<'a> {
    /// Promote to exclusive access, waiting for other readers to leave
    ///
    /// The returned guard must be dropped before this one.
    pub fn upgrade(&self) -> Result<WriteGuard<'a>> {
        self.lock.write()
    }
}

impl Drop for UpgradeableGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_upgradeable();
    }
}

/// Exclusive access; released on drop
pub struct WriteGuard<'a> {
    lock: &'a ReentrantRwLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}
