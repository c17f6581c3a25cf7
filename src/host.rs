// Host collaborators - Clock, console and tokenizer provided by the host process

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Current host time in seconds. Advances once per tick.
pub trait HostClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall-clock time since creation.
#[derive(Debug)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for SystemClock {
    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Clock moved explicitly by the owner.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, seconds: f64) {
        *self.now.lock() += seconds;
    }

    pub fn set(&self, seconds: f64) {
        *self.now.lock() = seconds;
    }
}

impl HostClock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

/// Receives server command lines to execute on the host console.
pub trait HostConsole {
    fn server_command(&mut self, line: &str);
}

/// Queues server commands for the host loop to run after the current tick.
#[derive(Debug, Default, Clone)]
pub struct QueuedConsole {
    queue: Arc<Mutex<VecDeque<String>>>,
}

impl QueuedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every queued line, oldest first.
    pub fn drain(&self) -> Vec<String> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl HostConsole for QueuedConsole {
    fn server_command(&mut self, line: &str) {
        self.queue.lock().push_back(line.trim_end().to_string());
    }
}

/// Split a console line on whitespace.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}
