/*
 * Copyright the basalt-mqtt contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

/*!
Module containing the worker-private table that correlates broker acknowledgments with the
commands that are waiting on them.
 */

use crate::command::Command;

use log::error;

// One sent-but-unacknowledged operation.  The record keeps its payload (notably the publish
// packet for QoS 1+ publishes) so session resumption can resend it verbatim.
pub(crate) struct PendingAck {
    pub(crate) packet_id: u16,
    pub(crate) command: Box<Command>,
}

// Fixed-capacity associative array from packet id to pending record.  Only ever touched by
// the worker thread, so no synchronization.  Storage is a preallocated slot vector with
// linear scans; capacities are small enough that anything fancier would cost more than it
// saves, and nothing here allocates after construction.
pub(crate) struct PendingAckTable {
    slots: Vec<Option<PendingAck>>,
}

impl PendingAckTable {

    pub(crate) fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        PendingAckTable {
            slots
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    pub(crate) fn is_full(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_some())
    }

    // Installs a pending entry.  Fails (returning the command to the caller) when the table
    // is full, when the packet id is the zero sentinel, or when an entry with the same packet
    // id already exists; the caller decides how to complete the command.
    pub(crate) fn store(&mut self, packet_id: u16, command: Box<Command>) -> Result<(), Box<Command>> {
        if packet_id == 0 {
            error!("pending ack table - rejecting reserved packet id 0");
            return Err(command);
        }

        if self.get(packet_id).is_some() {
            error!("pending ack table - packet id {} already has a pending entry", packet_id);
            return Err(command);
        }

        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(PendingAck {
                    packet_id,
                    command
                });
                Ok(())
            }
            None => {
                Err(command)
            }
        }
    }

    pub(crate) fn get(&self, packet_id: u16) -> Option<&PendingAck> {
        self.slots.iter().flatten().find(|entry| entry.packet_id == packet_id)
    }

    // Removes and returns the entry matching the packet id, if any.  The caller owns the
    // command again and is responsible for completing and releasing it.
    pub(crate) fn remove(&mut self, packet_id: u16) -> Option<PendingAck> {
        self.slots.iter_mut()
            .find(|slot| {
                matches!(slot, Some(entry) if entry.packet_id == packet_id)
            })
            .and_then(Option::take)
    }

    // Empties the table, handing every entry back to the caller.  Used by cancel-all and
    // clean-session resumption.
    pub(crate) fn drain(&mut self) -> Vec<PendingAck> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut PendingAck> {
        self.slots.iter_mut().flatten()
    }
}
