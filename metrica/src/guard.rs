//! Admission control for job cycles.
//!
//! At most one job cycle runs at a time. Start commands are deduplicated by
//! `(resource, generation)`: a repeated command for the same selection joins
//! the running cycle instead of submitting a second job, and a command for
//! the resource that is already being fetched joins that fetch whatever its
//! generation. A command for a different resource waits until the active
//! cycle is released, either because it finished or because the selection
//! moved away from it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use metrica_core::{CacheEntry, MetricaError, ResourceKey};
use tokio::sync::{Notify, watch};

/// What a finished cycle hands to everyone waiting on it.
pub type CycleOutcome = Result<Arc<CacheEntry>, MetricaError>;

/// Identity of a start command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandKey {
    /// Resource the command fetches.
    pub resource: ResourceKey,
    /// Selection generation the command was issued under.
    pub generation: u64,
}

#[derive(Default)]
struct Slots {
    active: Option<CommandKey>,
    commands: HashMap<CommandKey, watch::Receiver<Option<CycleOutcome>>>,
}

#[derive(Default)]
struct Shared {
    slots: Mutex<Slots>,
    released: Notify,
}

/// Tracks the single active job cycle and deduplicates start commands.
///
/// Clones share the same bookkeeping.
#[derive(Clone, Default)]
pub struct ConcurrencyGuard {
    shared: Arc<Shared>,
}

/// Answer to [`ConcurrencyGuard::admit`].
#[derive(Debug)]
pub enum Admission {
    /// The caller owns the new cycle and must run it.
    Started(CycleSlot),
    /// An equivalent cycle is already running; wait on it instead.
    Duplicate(CycleWaiter),
    /// Another resource is being fetched; try again once it is released.
    Deferred,
}

/// Answer to [`ConcurrencyGuard::admit_or_wait`].
#[derive(Debug)]
pub enum Ticket {
    /// The caller owns the cycle.
    Lead(CycleSlot),
    /// The caller joined a cycle owned by someone else.
    Follow(CycleWaiter),
}

impl ConcurrencyGuard {
    /// Empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.shared
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Try to start a cycle for `resource` under `generation`.
    #[must_use]
    pub fn admit(&self, resource: &ResourceKey, generation: u64) -> Admission {
        let key = CommandKey {
            resource: resource.clone(),
            generation,
        };
        let mut slots = self.slots();
        if let Some(rx) = slots.commands.get(&key) {
            return Admission::Duplicate(CycleWaiter::new(resource.clone(), rx.clone()));
        }
        match slots.active.clone() {
            Some(active) if &active.resource == resource => {
                match slots.commands.get(&active) {
                    Some(rx) => Admission::Duplicate(CycleWaiter::new(resource.clone(), rx.clone())),
                    None => Admission::Deferred,
                }
            }
            Some(_) => Admission::Deferred,
            None => {
                let (tx, rx) = watch::channel(None);
                slots.commands.insert(key.clone(), rx);
                slots.active = Some(key.clone());
                Admission::Started(CycleSlot {
                    guard: self.clone(),
                    key,
                    tx: Some(tx),
                })
            }
        }
    }

    /// Start a cycle only when nothing is active. Returns `None` when the
    /// same resource is already being fetched or another one holds the slot.
    #[must_use]
    pub fn try_start(&self, resource: &ResourceKey, generation: u64) -> Option<CycleSlot> {
        match self.admit(resource, generation) {
            Admission::Started(slot) => Some(slot),
            Admission::Duplicate(_) | Admission::Deferred => None,
        }
    }

    /// Admit `resource`, waiting while another resource holds the slot.
    pub async fn admit_or_wait(&self, resource: &ResourceKey, generation: u64) -> Ticket {
        loop {
            let released = self.shared.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();
            match self.admit(resource, generation) {
                Admission::Started(slot) => return Ticket::Lead(slot),
                Admission::Duplicate(waiter) => return Ticket::Follow(waiter),
                Admission::Deferred => released.await,
            }
        }
    }

    /// Release the active slot when it holds a resource other than `selected`.
    ///
    /// The released cycle keeps running until its next suspension point; its
    /// waiters still receive whatever it finishes with.
    pub fn supersede(&self, selected: &ResourceKey) {
        let released = {
            let mut slots = self.slots();
            match slots.active.as_ref() {
                Some(active) if &active.resource != selected => {
                    slots.active = None;
                    true
                }
                _ => false,
            }
        };
        if released {
            self.shared.released.notify_waiters();
        }
    }

    /// Forget in-flight commands issued before `generation`, except the
    /// active one.
    pub fn retain_generation(&self, generation: u64) {
        let mut slots = self.slots();
        let active = slots.active.clone();
        slots
            .commands
            .retain(|key, _| key.generation >= generation || Some(key) == active.as_ref());
    }

    /// True when a cycle for `resource` holds the slot.
    #[must_use]
    pub fn is_active(&self, resource: &ResourceKey) -> bool {
        self.slots()
            .active
            .as_ref()
            .is_some_and(|k| &k.resource == resource)
    }

    /// Command holding the slot, if any.
    #[must_use]
    pub fn active(&self) -> Option<CommandKey> {
        self.slots().active.clone()
    }

    fn release(
        &self,
        key: &CommandKey,
        tx: Option<watch::Sender<Option<CycleOutcome>>>,
        outcome: Option<CycleOutcome>,
    ) {
        {
            let mut slots = self.slots();
            slots.commands.remove(key);
            if slots.active.as_ref() == Some(key) {
                slots.active = None;
            }
            if let (Some(tx), Some(outcome)) = (tx, outcome) {
                tx.send_replace(Some(outcome));
            }
        }
        self.shared.released.notify_waiters();
    }
}

impl fmt::Debug for ConcurrencyGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots();
        f.debug_struct("ConcurrencyGuard")
            .field("active", &slots.active)
            .field("in_flight", &slots.commands.len())
            .finish()
    }
}

/// Ownership of an admitted cycle. Dropping it without [`CycleSlot::finish`]
/// releases the slot and reports the cycle as superseded to its waiters.
pub struct CycleSlot {
    guard: ConcurrencyGuard,
    key: CommandKey,
    tx: Option<watch::Sender<Option<CycleOutcome>>>,
}

impl CycleSlot {
    /// Command this slot was admitted for.
    #[must_use]
    pub const fn key(&self) -> &CommandKey {
        &self.key
    }

    /// A waiter that resolves when this cycle finishes.
    #[must_use]
    pub fn waiter(&self) -> CycleWaiter {
        let rx = match self.tx.as_ref() {
            Some(tx) => tx.subscribe(),
            None => watch::channel(None).1,
        };
        CycleWaiter::new(self.key.resource.clone(), rx)
    }

    /// Publish the outcome and release the slot.
    pub fn finish(mut self, outcome: CycleOutcome) {
        let tx = self.tx.take();
        self.guard.release(&self.key, tx, Some(outcome));
    }
}

impl Drop for CycleSlot {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            self.guard.release(&self.key, Some(tx), None);
        }
    }
}

impl fmt::Debug for CycleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleSlot").field("key", &self.key).finish()
    }
}

/// Handle for awaiting a cycle owned by someone else.
#[derive(Debug, Clone)]
pub struct CycleWaiter {
    resource: ResourceKey,
    rx: watch::Receiver<Option<CycleOutcome>>,
}

impl CycleWaiter {
    const fn new(resource: ResourceKey, rx: watch::Receiver<Option<CycleOutcome>>) -> Self {
        Self { resource, rx }
    }

    /// Wait for the cycle's outcome. A cycle dropped before finishing yields
    /// [`MetricaError::Superseded`].
    pub async fn outcome(mut self) -> CycleOutcome {
        let superseded = || MetricaError::superseded(self.resource.as_str());
        match self.rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone().unwrap_or_else(|| Err(superseded())),
            Err(_) => Err(superseded()),
        }
    }
}
