/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing the messaging interface the agent uses to move command records between
producer threads and the worker, together with a pooled, bounded default implementation.
 */

use crate::command::Command;

use log::warn;

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// The channel-and-allocator capability consumed by the agent.
///
/// One instance is shared between every producer and the worker, so all four operations must
/// be safe under concurrent invocation.  Implementations need not be lock-free.  `send` and
/// `receive` must preserve FIFO ordering for records sent from a single producer; ordering
/// across producers is unspecified.
///
/// Blocking semantics are uniform: `Duration::ZERO` means never block, `Duration::MAX` means
/// block until the operation can complete, and anything in between bounds the wait.
pub trait MessagingInterface : Send + Sync {

    /// Transfers ownership of a populated command record toward the worker.  On failure
    /// (queue full for the entire wait, or shut down) the record is handed back to the
    /// caller, which is expected to release it.
    fn send(&self, command: Box<Command>, wait: Duration) -> Result<(), Box<Command>>;

    /// Takes the next command record off the queue.  Worker-side counterpart of `send`.
    fn receive(&self, wait: Duration) -> Option<Box<Command>>;

    /// Allocates an empty command record for a producer to populate.  Returns None if no
    /// record became available within the wait.
    fn acquire_command(&self, wait: Duration) -> Option<Box<Command>>;

    /// Returns a record to the allocator after its lifecycle has finished.  The record is
    /// reset before it can be observed by a subsequent `acquire_command`.
    fn release_command(&self, command: Box<Command>);
}

// Converts a wait bound into an optional deadline, where None means wait forever.  Waits too
// large to represent as a timepoint get the same treatment as Duration::MAX.
fn compute_deadline(wait: Duration) -> Option<Instant> {
    if wait == Duration::MAX {
        None
    } else {
        Instant::now().checked_add(wait)
    }
}

// Blocks the guard on the condvar until the deadline.  Returns the reacquired guard and
// whether the deadline has passed; spurious wakeups are handled by the callers' re-check
// loops.
fn wait_for_signal<'a, T>(signal: &Condvar, guard: MutexGuard<'a, T>, deadline: &Option<Instant>) -> (MutexGuard<'a, T>, bool) {
    match deadline {
        None => {
            (signal.wait(guard).unwrap(), false)
        }
        Some(deadline) => {
            let now = Instant::now();
            if now >= *deadline {
                return (guard, true);
            }

            let (guard, _) = signal.wait_timeout(guard, *deadline - now).unwrap();
            (guard, Instant::now() >= *deadline)
        }
    }
}

/// A bounded command queue with an attached fixed-size command allocator, both built on
/// mutex-and-condvar pairs.
///
/// All command records are allocated once, at construction; steady-state operation moves the
/// same boxes between the pool, producers, the queue, and the worker without touching the
/// heap.  The queue bound is the agent's only backpressure mechanism: producers that submit
/// faster than the worker drains will block in `send` up to their configured wait.
pub struct PooledCommandQueue {
    queue: Mutex<VecDeque<Box<Command>>>,
    queue_capacity: usize,

    // producers wait on this for queue space
    space_available: Condvar,

    // the worker waits on this for incoming commands
    command_available: Condvar,

    pool: Mutex<Vec<Box<Command>>>,
    pool_capacity: usize,

    // producers wait on this for a free record
    record_available: Condvar,
}

impl PooledCommandQueue {

    /// Creates a new pooled command queue.  `queue_capacity` bounds how many in-flight
    /// commands can be awaiting the worker; `pool_capacity` bounds how many command records
    /// exist in total.
    pub fn new(queue_capacity: usize, pool_capacity: usize) -> Self {
        let mut pool = Vec::with_capacity(pool_capacity);
        pool.resize_with(pool_capacity, || Box::new(Command::default()));

        PooledCommandQueue {
            queue: Mutex::new(VecDeque::with_capacity(queue_capacity)),
            queue_capacity,
            space_available: Condvar::new(),
            command_available: Condvar::new(),
            pool: Mutex::new(pool),
            pool_capacity,
            record_available: Condvar::new(),
        }
    }
}

impl MessagingInterface for PooledCommandQueue {

    fn send(&self, command: Box<Command>, wait: Duration) -> Result<(), Box<Command>> {
        let deadline = compute_deadline(wait);
        let mut queue = self.queue.lock().unwrap();

        loop {
            if queue.len() < self.queue_capacity {
                queue.push_back(command);
                self.command_available.notify_one();
                return Ok(());
            }

            if wait.is_zero() {
                return Err(command);
            }

            let (reacquired, expired) = wait_for_signal(&self.space_available, queue, &deadline);
            queue = reacquired;

            if expired && queue.len() >= self.queue_capacity {
                return Err(command);
            }
        }
    }

    fn receive(&self, wait: Duration) -> Option<Box<Command>> {
        let deadline = compute_deadline(wait);
        let mut queue = self.queue.lock().unwrap();

        loop {
            if let Some(command) = queue.pop_front() {
                self.space_available.notify_one();
                return Some(command);
            }

            if wait.is_zero() {
                return None;
            }

            let (reacquired, expired) = wait_for_signal(&self.command_available, queue, &deadline);
            queue = reacquired;

            if expired && queue.is_empty() {
                return None;
            }
        }
    }

    fn acquire_command(&self, wait: Duration) -> Option<Box<Command>> {
        let deadline = compute_deadline(wait);
        let mut pool = self.pool.lock().unwrap();

        loop {
            if let Some(command) = pool.pop() {
                return Some(command);
            }

            if wait.is_zero() {
                return None;
            }

            let (reacquired, expired) = wait_for_signal(&self.record_available, pool, &deadline);
            pool = reacquired;

            if expired && pool.is_empty() {
                return None;
            }
        }
    }

    fn release_command(&self, mut command: Box<Command>) {
        command.reset();

        let mut pool = self.pool.lock().unwrap();
        if pool.len() < self.pool_capacity {
            pool.push(command);
            self.record_available.notify_one();
        } else {
            // a record this queue did not allocate; dropping it keeps the pool bounded
            warn!("release_command - pool already full, dropping foreign record");
        }
    }
}
