//! # Entry registry - the locked key → queue table.
//!
//! The registry owns every queue entry of a bus and performs all bookkeeping
//! on them: lazy creation, collecting-flag transitions and removal.
//!
//! ## Architecture
//! ```text
//! Mutex<State>
//!   └─► HashMap<KeyId, Entry>
//!         Entry { generation, is_collecting, pending, Queue<E> { tx, rx: Option<_> } }
//!
//! get_or_create(key)                      ─► clone of tx        (producers)
//! get_or_create_and_mark_collecting(key)  ─► rx checked out     (Idle → Collecting)
//! mark_not_collecting(key, gen, rx)       ─► rx checked back in (Collecting → Idle)
//! remove(key, options)                    ─► Entry, validated
//! remove_all()                            ─► every Entry
//! ```
//!
//! ## Rules
//! - One mutex guards the map and every `is_collecting` flag.
//! - The lock is held for bookkeeping only: no `.await`, no logger calls, no
//!   user `Drop` code (removed entries and orphaned receivers are returned to
//!   the caller and dropped after the lock is released).
//! - `is_collecting == true` iff the entry's receiver is checked out.
//! - Entries are only destroyed by `remove` / `remove_all`.

use std::any::Any;
use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::warn;

use crate::config::CloseOptions;
use crate::error::{CloseError, FlowAlreadyCollected};
use crate::events::{ChannelEvent, EventKey, KeyId};

/// Typed queue halves stored (erased) inside an [`Entry`].
struct Queue<E> {
    tx: mpsc::UnboundedSender<E>,
    /// `None` while a subscription has the receiver checked out.
    rx: Option<mpsc::UnboundedReceiver<E>>,
}

/// One registered key.
pub(crate) struct Entry {
    generation: u64,
    is_collecting: bool,
    /// Events sent and not yet received.
    pending: Arc<AtomicUsize>,
    /// `Queue<E>` for the key's event type.
    queue: Box<dyn Any + Send>,
}

impl Entry {
    fn new<E: ChannelEvent>(generation: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<E>();
        Self {
            generation,
            is_collecting: false,
            pending: Arc::new(AtomicUsize::new(0)),
            queue: Box::new(Queue { tx, rx: Some(rx) }),
        }
    }

    fn queue<E: ChannelEvent>(&self, key: KeyId) -> &Queue<E> {
        match self.queue.downcast_ref::<Queue<E>>() {
            Some(q) => q,
            None => unreachable!("entry {key:?} holds a queue of another event type"),
        }
    }

    fn queue_mut<E: ChannelEvent>(&mut self, key: KeyId) -> &mut Queue<E> {
        match self.queue.downcast_mut::<Queue<E>>() {
            Some(q) => q,
            None => unreachable!("entry {key:?} holds a queue of another event type"),
        }
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Closes the queue.
    ///
    /// Dropping the entry drops its sender: a consumer that has the receiver
    /// checked out drains what is buffered and then observes end of stream,
    /// and sends through stale handles fail once that receiver is gone. An
    /// idle receiver is dropped together with its unread events.
    pub(crate) fn close(self) {
        drop(self);
    }
}

/// Producer side of an entry, handed out by [`Registry::get_or_create`].
pub(crate) struct QueueHandle<E> {
    tx: mpsc::UnboundedSender<E>,
    pending: Arc<AtomicUsize>,
    /// True if this call installed the entry.
    pub(crate) created: bool,
}

impl<E> QueueHandle<E> {
    /// Non-blocking enqueue; returns the event if the receiver is gone.
    pub(crate) fn enqueue(&self, event: E) -> Result<(), E> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.tx.send(event).map_err(|mpsc::error::SendError(event)| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            event
        })
    }
}

/// Consumer side of an entry, checked out by
/// [`Registry::get_or_create_and_mark_collecting`].
pub(crate) struct Attached<E> {
    pub(crate) rx: mpsc::UnboundedReceiver<E>,
    pub(crate) pending: Arc<AtomicUsize>,
    pub(crate) generation: u64,
    /// True if this call installed the entry.
    pub(crate) created: bool,
}

/// Outcome of [`Registry::mark_not_collecting`].
pub(crate) enum Release<E> {
    /// Flag flipped back to idle; the receiver is back in the entry.
    Stopped,
    /// The entry was closed (or replaced) meanwhile; the receiver is
    /// returned so the caller can drop it outside the lock.
    Detached(mpsc::UnboundedReceiver<E>),
}

/// Point-in-time view of one entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntrySnapshot {
    /// Entry key.
    pub key: KeyId,
    /// Whether a subscription is attached.
    pub is_collecting: bool,
    /// Number of unread events.
    pub pending: usize,
}

struct State {
    entries: HashMap<KeyId, Entry>,
    next_generation: u64,
}

impl State {
    fn install<E: ChannelEvent>(&mut self, key: KeyId) -> (&mut Entry, bool) {
        let generation = self.next_generation;
        match self.entries.entry(key) {
            MapEntry::Occupied(o) => (o.into_mut(), false),
            MapEntry::Vacant(v) => {
                self.next_generation += 1;
                (v.insert(Entry::new::<E>(generation)), true)
            }
        }
    }
}

/// Lock-guarded table of queue entries.
pub(crate) struct Registry {
    state: Mutex<State>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                next_generation: 0,
            }),
        }
    }

    /// Critical sections never leave the map half-updated, so a poisoned
    /// lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a producer handle for `key`, creating an idle entry if absent.
    pub(crate) fn get_or_create<E: ChannelEvent>(&self, key: EventKey<E>) -> QueueHandle<E> {
        let id = key.id();
        let mut state = self.lock();
        let (entry, created) = state.install::<E>(id);
        QueueHandle {
            tx: entry.queue::<E>(id).tx.clone(),
            pending: Arc::clone(&entry.pending),
            created,
        }
    }

    /// Creates the entry if absent and moves it `Idle → Collecting`,
    /// checking out its receiver.
    pub(crate) fn get_or_create_and_mark_collecting<E: ChannelEvent>(
        &self,
        key: EventKey<E>,
    ) -> Result<Attached<E>, FlowAlreadyCollected> {
        let id = key.id();
        let mut state = self.lock();
        let (entry, created) = state.install::<E>(id);
        if entry.is_collecting {
            return Err(FlowAlreadyCollected { key: id });
        }

        let Some(rx) = entry.queue_mut::<E>(id).rx.take() else {
            unreachable!("idle entry {id:?} has no receiver");
        };
        entry.is_collecting = true;
        Ok(Attached {
            rx,
            pending: Arc::clone(&entry.pending),
            generation: entry.generation,
            created,
        })
    }

    /// Moves the entry `Collecting → Idle`, checking the receiver back in.
    ///
    /// Only the entry of the same `generation` is touched; a subscription
    /// outliving its entry gets its receiver back as [`Release::Detached`].
    pub(crate) fn mark_not_collecting<E: ChannelEvent>(
        &self,
        key: KeyId,
        generation: u64,
        rx: mpsc::UnboundedReceiver<E>,
    ) -> Release<E> {
        let mut state = self.lock();
        let entry = match state.entries.get_mut(&key) {
            Some(entry) if entry.generation == generation => entry,
            _ => return Release::Detached(rx),
        };
        if !entry.is_collecting {
            warn!(key = %key, generation, "released an entry that was not being collected");
            return Release::Detached(rx);
        }

        entry.queue_mut::<E>(key).rx = Some(rx);
        entry.is_collecting = false;
        Release::Stopped
    }

    /// Removes the entry for `key` after validating it against `options`.
    ///
    /// Checks run in order: existence, collecting, emptiness. `Ok(None)`
    /// means the key was absent and `require_exists` was off.
    pub(crate) fn remove(
        &self,
        key: KeyId,
        options: CloseOptions,
    ) -> Result<Option<Entry>, CloseError> {
        let mut state = self.lock();
        let Some(entry) = state.entries.get(&key) else {
            return if options.require_exists {
                Err(CloseError::BusDoesNotExist { key })
            } else {
                Ok(None)
            };
        };
        if options.require_not_collecting && entry.is_collecting {
            return Err(CloseError::BusIsCollecting { key });
        }
        if options.require_channel_empty && entry.pending() > 0 {
            return Err(CloseError::BusIsNotEmpty { key });
        }
        Ok(state.entries.remove(&key))
    }

    /// Empties the table unconditionally.
    pub(crate) fn remove_all(&self) -> Vec<(KeyId, Entry)> {
        self.lock().entries.drain().collect()
    }

    pub(crate) fn contains(&self, key: KeyId) -> bool {
        self.lock().entries.contains_key(&key)
    }

    pub(crate) fn is_collecting(&self, key: KeyId) -> bool {
        self.lock()
            .entries
            .get(&key)
            .map(|e| e.is_collecting)
            .unwrap_or(false)
    }

    pub(crate) fn pending(&self, key: KeyId) -> usize {
        self.lock().entries.get(&key).map(Entry::pending).unwrap_or(0)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns all entries sorted by key name.
    pub(crate) fn snapshot(&self) -> Vec<EntrySnapshot> {
        let mut out: Vec<EntrySnapshot> = self
            .lock()
            .entries
            .iter()
            .map(|(key, e)| EntrySnapshot {
                key: *key,
                is_collecting: e.is_collecting,
                pending: e.pending(),
            })
            .collect();
        out.sort_unstable_by(|a, b| {
            (a.key.name(), a.key.type_name()).cmp(&(b.key.name(), b.key.type_name()))
        });
        out
    }
}
