//! Family roster with locations and safety statuses.
//!
//! The store is the only owner of [`Member`] values. Everything else refers to
//! members by [`MemberId`] and resolves names through here.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{Coordinate, CoordinateError, UnixTimeMs, SELF_MEMBER_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u32);

impl MemberId {
    pub const SELF: Self = Self(SELF_MEMBER_ID);

    #[must_use]
    pub const fn is_self(self) -> bool {
        self.0 == SELF_MEMBER_ID
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberStatus {
    Safe,
    InSos,
    Offline,
}

impl MemberStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::InSos => "In SOS",
            Self::Offline => "Offline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinate: Coordinate,
    pub captured_at: UnixTimeMs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub avatar_url: String,
    pub status: MemberStatus,
    pub location: Option<Location>,
}

impl Member {
    fn new(id: u32, name: &str, status: MemberStatus, location: Option<Location>) -> Self {
        Self {
            id: MemberId(id),
            name: name.to_string(),
            avatar_url: format!("https://picsum.photos/seed/{}/100", name.to_lowercase()),
            status,
            location,
        }
    }
}

/// A position/status update arriving from a presence feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceReport {
    pub member: MemberId,
    pub coordinate: Option<Coordinate>,
    pub status: Option<MemberStatus>,
    pub captured_at: UnixTimeMs,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PresenceError {
    #[error("Unknown family member {0}")]
    UnknownMember(MemberId),
    #[error("Presence for yourself comes from this device")]
    SelfReport,
    #[error(transparent)]
    Coordinate(#[from] CoordinateError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceStore {
    members: Vec<Member>,
}

impl PresenceStore {
    #[must_use]
    pub fn new(members: Vec<Member>) -> Self {
        Self { members }
    }

    /// Built-in roster used until a real feed is connected. Self starts without
    /// a location; the device fills it in.
    #[must_use]
    pub fn default_roster(now: UnixTimeMs) -> Self {
        let at = |lat: f64, lng: f64, captured_at: UnixTimeMs| {
            Coordinate::new(lat, lng).ok().map(|coordinate| Location {
                coordinate,
                captured_at,
            })
        };
        let hour_ago = UnixTimeMs(now.0.saturating_sub(3_600_000));

        Self::new(vec![
            Member::new(0, "You", MemberStatus::Safe, None),
            Member::new(1, "Mom", MemberStatus::Safe, at(34.055, -118.245, now)),
            Member::new(2, "Dad", MemberStatus::Safe, at(34.050, -118.240, now)),
            Member::new(3, "Jessica", MemberStatus::Offline, at(34.048, -118.250, hour_ago)),
        ])
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[must_use]
    pub fn get(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    fn get_mut(&mut self, id: MemberId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == id)
    }

    #[must_use]
    pub fn self_member(&self) -> Option<&Member> {
        self.get(MemberId::SELF)
    }

    #[must_use]
    pub fn self_location(&self) -> Option<Location> {
        self.self_member().and_then(|m| m.location)
    }

    /// Display name, falling back to a generic label for unknown ids.
    #[must_use]
    pub fn name_of(&self, id: MemberId) -> String {
        self.get(id)
            .map_or_else(|| format!("Member {id}"), |m| m.name.clone())
    }

    /// Ids of everyone except self, in roster order.
    #[must_use]
    pub fn others(&self) -> Vec<MemberId> {
        self.members
            .iter()
            .filter(|m| !m.id.is_self())
            .map(|m| m.id)
            .collect()
    }

    pub fn update_self_location(&mut self, coordinate: Coordinate, now: UnixTimeMs) {
        if let Some(me) = self.get_mut(MemberId::SELF) {
            me.location = Some(advance(me.location, coordinate, now));
            debug!(lat = coordinate.lat(), lng = coordinate.lng(), "self location updated");
        }
    }

    /// Moves every other member with a known location by up to `jitter_deg`
    /// on each axis. Returns how many members moved.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R, jitter_deg: f64, now: UnixTimeMs) -> usize {
        let jitter = jitter_deg.abs();
        let mut moved = 0;
        for member in self.members.iter_mut().filter(|m| !m.id.is_self()) {
            let Some(current) = member.location else {
                continue;
            };
            let lat = current.coordinate.lat() + rng.gen_range(-jitter..=jitter);
            let lng = current.coordinate.lng() + rng.gen_range(-jitter..=jitter);
            if let Ok(coordinate) = Coordinate::clamped(lat, lng) {
                member.location = Some(advance(Some(current), coordinate, now));
                moved += 1;
            }
        }
        moved
    }

    /// Returns the status the member had before the write.
    pub fn set_status(&mut self, id: MemberId, status: MemberStatus) -> Result<MemberStatus, PresenceError> {
        let member = self.get_mut(id).ok_or(PresenceError::UnknownMember(id))?;
        let previous = member.status;
        member.status = status;
        if previous != status {
            debug!(member = %id, from = ?previous, to = ?status, "status changed");
        }
        Ok(previous)
    }

    #[must_use]
    pub fn status_of(&self, id: MemberId) -> Option<MemberStatus> {
        self.get(id).map(|m| m.status)
    }

    pub fn apply_report(&mut self, report: &PresenceReport) -> Result<(), PresenceError> {
        if report.member.is_self() {
            return Err(PresenceError::SelfReport);
        }
        let member = self
            .get_mut(report.member)
            .ok_or(PresenceError::UnknownMember(report.member))?;
        if let Some(coordinate) = report.coordinate {
            member.location = Some(advance(member.location, coordinate, report.captured_at));
        }
        if let Some(status) = report.status {
            member.status = status;
        }
        Ok(())
    }
}

// Timestamps per member never go backwards.
fn advance(previous: Option<Location>, coordinate: Coordinate, at: UnixTimeMs) -> Location {
    let captured_at = previous.map_or(at, |p| p.captured_at.max(at));
    Location {
        coordinate,
        captured_at,
    }
}
