// Delay Scheduler - Deferred callbacks fired from the host tick
//
// Entries fire once the host clock reaches their fire time, in ascending
// fire-time order with insertion order breaking ties. Each tick drains the
// due entries before running them, so an entry scheduled by a callback is
// never fired in the same pass.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

use crate::commands::registry::panic_message;
use crate::host::HostClock;
use crate::logging::CommandLogger;


pub type DelayCallback<C> = Box<dyn FnOnce(&mut C, Vec<String>) -> anyhow::Result<()>>;

/// Opaque identity of a scheduled entry, usable for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DelayHandle(u64);

#[derive(Debug, thiserror::Error)]
pub enum DelayError {
    #[error("Invalid delay {0}: delay must be a finite number of seconds")]
    InvalidDelay(f64),
}

#[derive(Debug, Clone, Copy)]
struct FireTime(f64);

impl PartialEq for FireTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FireTime {}

impl PartialOrd for FireTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FireTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct DelayKey {
    fire_at: FireTime,
    seq: u64,
}

pub struct DelayEntry<C> {
    handle: DelayHandle,
    fire_at: f64,
    args: Vec<String>,
    callback: DelayCallback<C>,
}

impl<C> DelayEntry<C> {
    pub fn handle(&self) -> DelayHandle {
        self.handle
    }

    pub fn fire_at(&self) -> f64 {
        self.fire_at
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Consume the entry and run its callback with the bound arguments.
    pub fn fire(self, ctx: &mut C) -> anyhow::Result<()> {
        (self.callback)(ctx, self.args)
    }
}

/// Read-only view of a pending entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingDelay {
    pub handle: DelayHandle,
    pub fire_at: f64,
    pub args: Vec<String>,
}

pub struct DelayScheduler<C> {
    clock: Arc<dyn HostClock>,
    queue: BTreeMap<DelayKey, DelayEntry<C>>,
    next_seq: u64,
}

impl<C> DelayScheduler<C> {
    pub fn new(clock: Arc<dyn HostClock>) -> Self {
        Self {
            clock,
            queue: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Queue `callback(args)` to run `delay_seconds` from the current host time.
    pub fn schedule<F>(&mut self, delay_seconds: f64, callback: F, args: Vec<String>) -> Result<DelayHandle, DelayError>
    where
        F: FnOnce(&mut C, Vec<String>) -> anyhow::Result<()> + 'static,
    {
        if !delay_seconds.is_finite() {
            return Err(DelayError::InvalidDelay(delay_seconds));
        }

        let fire_at = self.clock.now() + delay_seconds;
        let seq = self.next_seq;
        self.next_seq += 1;

        let handle = DelayHandle(seq);
        self.queue.insert(
            DelayKey {
                fire_at: FireTime(fire_at),
                seq,
            },
            DelayEntry {
                handle,
                fire_at,
                args,
                callback: Box::new(callback),
            },
        );

        debug!(?handle, fire_at, "scheduled delay");
        Ok(handle)
    }

    /// Remove a pending entry. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: DelayHandle) -> bool {
        let key = self
            .queue
            .keys()
            .find(|key| key.seq == handle.0)
            .copied();

        match key {
            Some(key) => {
                self.queue.remove(&key);
                debug!(?handle, "cancelled delay");
                true
            }
            None => false,
        }
    }

    /// Remove and return every entry whose fire time has been reached.
    pub fn take_due(&mut self) -> Vec<DelayEntry<C>> {
        let now = FireTime(self.clock.now());
        let mut due = Vec::new();

        while let Some(entry) = self.queue.first_entry() {
            if entry.key().fire_at > now {
                break;
            }
            due.push(entry.remove());
        }

        due
    }

    /// Pending entries in the order they will fire.
    pub fn pending(&self) -> Vec<PendingDelay> {
        self.queue
            .values()
            .map(|entry| PendingDelay {
                handle: entry.handle,
                fire_at: entry.fire_at,
                args: entry.args.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Fire every due entry of the scheduler reached through `scheduler`.
///
/// Callbacks receive the whole context, so they may schedule further
/// entries; those wait for a later tick. Errors and panics are reported to
/// `logger` and never stop the remaining entries. Returns how many entries
/// fired.
pub fn run_due<C>(
    ctx: &mut C,
    scheduler: fn(&mut C) -> &mut DelayScheduler<C>,
    logger: &CommandLogger,
) -> usize {
    let due = scheduler(ctx).take_due();
    let fired = due.len();

    for entry in due {
        let handle = entry.handle();
        let command = entry.args().join(" ");
        let outcome = catch_unwind(AssertUnwindSafe(|| entry.fire(ctx)));
        let message = match outcome {
            Ok(Ok(())) => {
                debug!(?handle, "fired delay");
                continue;
            }
            Ok(Err(e)) => format!("{:#}", e),
            Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
        };

        error!(?handle, "delayed callback failed: {}", message);
        logger.diagnostic(&format!(
            "Error while executing delayed command \"{}\": {}",
            command, message
        ));
    }

    fired
}
