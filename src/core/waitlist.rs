//! Ordered, deduplicated waitlist for one course.
//!
//! Indices here are 0-based. Out-of-range indices never panic: they yield
//! `None`/`false` and leave the list untouched, since administrative edits
//! come from free-form user input.

use super::participant::{MemberId, ParticipantRef};

#[derive(Debug, Default)]
pub struct Waitlist {
    entries: Vec<ParticipantRef>,
    /// Cached count; always equal to `entries.len()`.
    size: usize,
}

impl Waitlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, index: usize) -> Option<&ParticipantRef> {
        self.entries.get(index)
    }

    pub fn head(&self) -> Option<&ParticipantRef> {
        self.entries.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticipantRef> {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<MemberId> {
        self.entries.iter().map(|p| p.id()).collect()
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.position_of(id).is_some()
    }

    pub fn position_of(&self, id: MemberId) -> Option<usize> {
        self.entries.iter().position(|p| p.id() == id)
    }

    /// Append to the tail. Returns false if the participant is already queued.
    pub fn append(&mut self, participant: ParticipantRef) -> bool {
        if self.contains(participant.id()) {
            return false;
        }
        self.entries.push(participant);
        self.size += 1;
        true
    }

    /// Remove by identity. Returns the removed entry, or `None` if absent.
    pub fn remove(&mut self, id: MemberId) -> Option<ParticipantRef> {
        let index = self.position_of(id)?;
        let removed = self.entries.remove(index);
        self.size -= 1;
        Some(removed)
    }

    /// Pop the entry at `from`, clear its serving flag and reinsert it at `to`.
    ///
    /// Both indices must address an existing entry.
    pub fn move_entry(&mut self, from: usize, to: usize) -> Option<ParticipantRef> {
        if from >= self.size || to >= self.size {
            return None;
        }
        let participant = self.entries.remove(from);
        participant.lock().being_served = false;
        self.entries.insert(to, participant.clone());
        Some(participant)
    }

    /// Exchange two entries in place.
    pub fn swap(&mut self, i: usize, j: usize) -> bool {
        if i >= self.size || j >= self.size {
            return false;
        }
        self.entries.swap(i, j);
        true
    }

    /// Delete the entry at `index`.
    pub fn kick(&mut self, index: usize) -> Option<ParticipantRef> {
        if index >= self.size {
            return None;
        }
        let removed = self.entries.remove(index);
        self.size -= 1;
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.size = 0;
    }

    /// If the head is already being served, send it to the back.
    ///
    /// The rotated participant has its serving flag cleared and its served
    /// counter bumped, and is returned so its room can be released.
    pub fn rotate_served_to_back(&mut self) -> Option<ParticipantRef> {
        let head_served = self.head().map(|p| p.lock().being_served)?;
        if !head_served {
            return None;
        }
        let last = self.size - 1;
        let participant = self.move_entry(0, last)?;
        participant.lock().times_served += 1;
        Some(participant)
    }
}
