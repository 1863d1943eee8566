//! Board locations and the location tuple written into wire messages.

use bitflags::bitflags;

use crate::ids::PlayerId;

bitflags! {
    /// Card locations. The low byte is what a card's `location` field holds;
    /// the upper bits are alias zones accepted by `move_to_field` and expanded
    /// into a concrete location plus a zone mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    #[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
    pub struct Location: u32 {
        const DECK = 0x01;
        const HAND = 0x02;
        const MZONE = 0x04;
        const SZONE = 0x08;
        const GRAVE = 0x10;
        const REMOVED = 0x20;
        const EXTRA = 0x40;
        const OVERLAY = 0x80;
        const ONFIELD = Self::MZONE.bits() | Self::SZONE.bits();
        const FZONE = 0x100;
        const PZONE = 0x200;
        const MMZONE = 0x400;
        const EMZONE = 0x800;
        const STZONE = 0x1000;
    }
}

impl Location {
    /// Wire byte for this location (alias bits are never written).
    pub fn to_wire(self) -> u8 {
        (self.bits() & 0xff) as u8
    }

    pub fn is_onfield(self) -> bool {
        self.intersects(Location::ONFIELD)
    }

    /// Piles whose iteration order matters for "top" semantics.
    pub fn is_pile(self) -> bool {
        self.intersects(Location::DECK | Location::EXTRA | Location::GRAVE | Location::REMOVED)
    }
}

/// Why a zone is being queried; capacity rules differ for cards entering the
/// field and cards changing control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum LocationReason {
    #[default]
    ToField,
    Control,
}

/// Concrete destination after alias expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneTarget {
    pub location: Location,
    pub zone: u32,
    pub pzone: bool,
}

/// Expand `move_to_field` alias locations into a real location and zone mask.
pub fn expand_alias(location: Location, zone: u32) -> ZoneTarget {
    if location == Location::PZONE {
        ZoneTarget { location: Location::SZONE, zone, pzone: true }
    } else if location == Location::FZONE {
        ZoneTarget { location: Location::SZONE, zone: 0x1 << 5, pzone: false }
    } else if location == Location::MMZONE {
        ZoneTarget { location: Location::MZONE, zone: zone & 0x1f, pzone: false }
    } else if location == Location::STZONE {
        ZoneTarget { location: Location::SZONE, zone: zone & 0x1f, pzone: false }
    } else if location == Location::EMZONE {
        ZoneTarget { location: Location::MZONE, zone: zone & 0x60, pzone: false }
    } else {
        ZoneTarget { location, zone, pzone: false }
    }
}

/// Location tuple as serialized into move/summon/set records:
/// controller `u8`, location `u8`, sequence `u32`, position `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct LocInfo {
    pub controller: u8,
    pub location: u8,
    pub sequence: u32,
    pub position: u32,
}

impl LocInfo {
    pub fn new(controller: PlayerId, location: Location, sequence: u32, position: u32) -> Self {
        Self {
            controller: controller.0,
            location: location.to_wire(),
            sequence,
            position,
        }
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.push(self.controller);
        out.push(self.location);
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out.extend_from_slice(&self.position.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_expansion() {
        let t = expand_alias(Location::FZONE, 0xff);
        assert_eq!(t.location, Location::SZONE);
        assert_eq!(t.zone, 0x20);

        let t = expand_alias(Location::EMZONE, 0xff);
        assert_eq!(t.location, Location::MZONE);
        assert_eq!(t.zone, 0x60);

        let t = expand_alias(Location::PZONE, 0x3);
        assert!(t.pzone);
        assert_eq!(t.location, Location::SZONE);

        let t = expand_alias(Location::MZONE, 0x7);
        assert_eq!(t.zone, 0x7);
        assert!(!t.pzone);
    }

    #[test]
    fn test_loc_info_layout() {
        let info = LocInfo::new(PlayerId::ONE, Location::MZONE, 3, 0x1);
        let mut out = Vec::new();
        info.write(&mut out);
        assert_eq!(out, vec![1, 0x04, 3, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_location_predicates() {
        assert!(Location::MZONE.is_onfield());
        assert!(!Location::GRAVE.is_onfield());
        assert!(Location::DECK.is_pile());
        assert!(!Location::HAND.is_pile());
    }
}
