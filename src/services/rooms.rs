//! Live-room collaborator contract and the in-memory room directory.
//!
//! The directory is the room backend used with the Telegram transport: tutors
//! open restricted rooms, students enter rooms they have access to or redeem
//! a single-use invite, and the bot may relocate anyone directly.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::core::MemberId;
use crate::error::{Error, Result};

/// Opaque live-room identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single-use invite token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InviteToken(pub String);

impl fmt::Display for InviteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operations the handoff needs from the real-time room system.
#[async_trait]
pub trait LiveRooms: Send + Sync {
    async fn current_room(&self, person: MemberId) -> Result<Option<RoomId>>;

    /// Relocate `person` into `room`. Fails with `RoomNotFound` if it is gone.
    async fn move_into(&self, person: MemberId, room: &RoomId) -> Result<()>;

    async fn create_invite(&self, room: &RoomId) -> Result<InviteToken>;

    async fn grant_temporary_access(&self, room: &RoomId, person: MemberId) -> Result<()>;

    async fn revoke_access(&self, room: &RoomId, person: MemberId) -> Result<()>;

    async fn disconnect(&self, person: MemberId) -> Result<()>;
}

#[derive(Debug, Default)]
struct Room {
    owner: Option<MemberId>,
    restricted: bool,
    allowed: HashSet<MemberId>,
}

#[derive(Debug, Default)]
struct Directory {
    rooms: HashMap<RoomId, Room>,
    presence: HashMap<MemberId, RoomId>,
    invites: HashMap<String, RoomId>,
}

impl Directory {
    fn require(&self, room: &RoomId) -> Result<&Room> {
        self.rooms
            .get(room)
            .ok_or_else(|| Error::RoomNotFound(room.to_string()))
    }
}

/// In-memory rooms with presence, access lists and invites.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    state: Mutex<Directory>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a room and place its owner in it. Reopening an existing room
    /// just moves the owner there.
    pub fn open_room(&self, name: &str, owner: Option<MemberId>, restricted: bool) -> RoomId {
        let id = RoomId::new(name);
        let mut state = self.state.lock();
        state.rooms.entry(id.clone()).or_insert_with(|| Room {
            owner,
            restricted,
            allowed: HashSet::new(),
        });
        if let Some(owner) = owner {
            state.presence.insert(owner, id.clone());
        }
        tracing::debug!(room = %id, restricted, "Opened room");
        id
    }

    /// Close a room, disconnecting everyone in it and voiding its invites.
    pub fn close_room(&self, room: &RoomId) -> bool {
        let mut state = self.state.lock();
        if state.rooms.remove(room).is_none() {
            return false;
        }
        state.presence.retain(|_, r| r != room);
        state.invites.retain(|_, r| r != room);
        tracing::debug!(room = %room, "Closed room");
        true
    }

    /// Enter a room on one's own. Restricted rooms need an access grant.
    pub fn enter(&self, person: MemberId, room: &RoomId) -> Result<()> {
        let mut state = self.state.lock();
        let target = state.require(room)?;
        let permitted = !target.restricted
            || target.owner == Some(person)
            || target.allowed.contains(&person);
        if !permitted {
            return Err(Error::Room(format!("no access to room {}", room)));
        }
        state.presence.insert(person, room.clone());
        Ok(())
    }

    /// Redeem a single-use invite, entering its room.
    pub fn redeem_invite(&self, person: MemberId, token: &str) -> Result<RoomId> {
        let mut state = self.state.lock();
        let room = state
            .invites
            .remove(token.trim())
            .ok_or_else(|| Error::NotFound(format!("invite {}", token)))?;
        state.require(&room)?;
        state.presence.insert(person, room.clone());
        Ok(room)
    }

    pub fn leave(&self, person: MemberId) -> Option<RoomId> {
        self.state.lock().presence.remove(&person)
    }

    pub fn members(&self, room: &RoomId) -> Vec<MemberId> {
        let state = self.state.lock();
        let mut members: Vec<MemberId> = state
            .presence
            .iter()
            .filter(|(_, r)| *r == room)
            .map(|(p, _)| *p)
            .collect();
        members.sort();
        members
    }

    pub fn has_access(&self, room: &RoomId, person: MemberId) -> bool {
        self.state
            .lock()
            .rooms
            .get(room)
            .map_or(false, |r| r.allowed.contains(&person))
    }

    pub fn room_names(&self) -> Vec<RoomId> {
        let mut names: Vec<RoomId> = self.state.lock().rooms.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl LiveRooms for RoomDirectory {
    async fn current_room(&self, person: MemberId) -> Result<Option<RoomId>> {
        Ok(self.state.lock().presence.get(&person).cloned())
    }

    async fn move_into(&self, person: MemberId, room: &RoomId) -> Result<()> {
        let mut state = self.state.lock();
        state.require(room)?;
        state.presence.insert(person, room.clone());
        Ok(())
    }

    async fn create_invite(&self, room: &RoomId) -> Result<InviteToken> {
        let mut state = self.state.lock();
        state.require(room)?;
        let ulid = ulid::Ulid::new().to_string();
        let token = ulid[ulid.len() - 8..].to_string();
        state.invites.insert(token.clone(), room.clone());
        Ok(InviteToken(token))
    }

    async fn grant_temporary_access(&self, room: &RoomId, person: MemberId) -> Result<()> {
        let mut state = self.state.lock();
        let target = state
            .rooms
            .get_mut(room)
            .ok_or_else(|| Error::RoomNotFound(room.to_string()))?;
        target.allowed.insert(person);
        Ok(())
    }

    async fn revoke_access(&self, room: &RoomId, person: MemberId) -> Result<()> {
        if let Some(target) = self.state.lock().rooms.get_mut(room) {
            target.allowed.remove(&person);
        }
        Ok(())
    }

    async fn disconnect(&self, person: MemberId) -> Result<()> {
        self.state.lock().presence.remove(&person);
        Ok(())
    }
}
