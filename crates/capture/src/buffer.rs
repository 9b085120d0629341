//! Bounded FIFO of captured packets.

use std::collections::VecDeque;

use bluefang_common::CapturedPacket;

/// Holds at most `capacity` packets; inserting into a full buffer drops
/// the oldest first.
#[derive(Debug, Clone)]
pub struct PacketBuffer {
    capacity: usize,
    packets: VecDeque<CapturedPacket>,
}

impl PacketBuffer {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            packets: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Append `packet`, returning the evicted oldest entry if the buffer was full.
    pub fn push(&mut self, packet: CapturedPacket) -> Option<CapturedPacket> {
        let evicted = if self.packets.len() >= self.capacity {
            self.packets.pop_front()
        } else {
            None
        };
        self.packets.push_back(packet);
        evicted
    }

    /// Change the cap, dropping the oldest entries that no longer fit.
    /// Returns how many were dropped.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity.max(1);
        let excess = self.packets.len().saturating_sub(self.capacity);
        self.packets.drain(..excess);
        excess
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapturedPacket> {
        self.packets.iter()
    }

    pub fn to_vec(&self) -> Vec<CapturedPacket> {
        self.packets.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.packets.clear();
    }
}
