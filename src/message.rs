//! Outgoing message records and their binary layouts.
//!
//! Handlers append typed [`Message`]s to the duel's [`MessageLog`]; clients
//! consume the encoded byte form. Every record is a one-byte tag followed by
//! little-endian fields in a fixed order.

use crate::flags::{Position, Reason};
use crate::ids::PlayerId;
use crate::zone::{LocInfo, Location};

/// Message tags.
pub mod msg_id {
    pub const HINT: u8 = 2;
    pub const CONFIRM_CARDS: u8 = 31;
    pub const SHUFFLE_HAND: u8 = 33;
    pub const SHUFFLE_SET_CARD: u8 = 36;
    pub const DECK_TOP: u8 = 38;
    pub const MOVE: u8 = 50;
    pub const POS_CHANGE: u8 = 53;
    pub const SET: u8 = 54;
    pub const SWAP: u8 = 55;
    pub const SUMMONING: u8 = 60;
    pub const SUMMONED: u8 = 61;
    pub const SPSUMMONING: u8 = 62;
    pub const SPSUMMONED: u8 = 63;
    pub const FLIPSUMMONING: u8 = 64;
    pub const FLIPSUMMONED: u8 = 65;
    pub const CHAINING: u8 = 70;
    pub const CHAIN_SOLVING: u8 = 72;
    pub const CHAIN_SOLVED: u8 = 73;
    pub const CHAIN_END: u8 = 74;
    pub const DRAW: u8 = 90;
    pub const DAMAGE: u8 = 91;
    pub const RECOVER: u8 = 92;
    pub const EQUIP: u8 = 93;
    pub const PAY_LPCOST: u8 = 100;
    pub const REMOVE_COUNTER: u8 = 102;
    pub const TOSS_COIN: u8 = 130;
    pub const TOSS_DICE: u8 = 131;
    pub const CARD_HINT: u8 = 160;
}

/// `CardHint` kinds.
pub mod card_hint {
    pub const DESC_ADD: u8 = 6;
    pub const DESC_REMOVE: u8 = 7;
}

/// Card revealed by a `ConfirmCards` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfirmedCard {
    pub code: u32,
    pub controller: PlayerId,
    pub location: Location,
    pub sequence: u32,
}

/// Card entry in a `Draw` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct DrawnCard {
    pub code: u32,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Message {
    Hint {
        hint_type: u8,
        player: PlayerId,
        data: u64,
    },
    ConfirmCards {
        player: PlayerId,
        cards: Vec<ConfirmedCard>,
    },
    ShuffleHand {
        player: PlayerId,
        codes: Vec<u32>,
    },
    ShuffleSetCard {
        location: Location,
        old: Vec<LocInfo>,
        new: Vec<LocInfo>,
    },
    DeckTop {
        player: PlayerId,
        offset: u32,
        code: u32,
        position: Position,
    },
    Move {
        code: u32,
        from: LocInfo,
        to: LocInfo,
        reason: Reason,
    },
    PosChange {
        code: u32,
        controller: PlayerId,
        location: Location,
        sequence: u8,
        previous: Position,
        current: Position,
    },
    Set {
        code: u32,
        info: LocInfo,
    },
    Swap {
        code1: u32,
        info1: LocInfo,
        code2: u32,
        info2: LocInfo,
    },
    Summoning {
        code: u32,
        info: LocInfo,
    },
    Summoned,
    SpSummoning {
        code: u32,
        info: LocInfo,
    },
    SpSummoned,
    FlipSummoning {
        code: u32,
        info: LocInfo,
    },
    FlipSummoned,
    Chaining {
        code: u32,
        info: LocInfo,
        triggering_controller: PlayerId,
        triggering_location: Location,
        triggering_sequence: u32,
        description: u64,
        chain_count: u32,
    },
    ChainSolving {
        chain_count: u8,
    },
    ChainSolved {
        chain_count: u8,
    },
    ChainEnd,
    Draw {
        player: PlayerId,
        cards: Vec<DrawnCard>,
    },
    Damage {
        player: PlayerId,
        amount: u32,
        reason: Reason,
    },
    Recover {
        player: PlayerId,
        amount: u32,
    },
    Equip {
        equip: LocInfo,
        target: LocInfo,
    },
    PayLpCost {
        player: PlayerId,
        amount: u32,
    },
    RemoveCounter {
        counter_type: u16,
        controller: PlayerId,
        location: Location,
        sequence: u8,
        count: u16,
    },
    TossCoin {
        player: PlayerId,
        results: Vec<u8>,
    },
    TossDice {
        player: PlayerId,
        results: Vec<u8>,
    },
    CardHint {
        info: LocInfo,
        hint_type: u8,
        value: u64,
    },
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

impl Message {
    pub fn id(&self) -> u8 {
        match self {
            Message::Hint { .. } => msg_id::HINT,
            Message::ConfirmCards { .. } => msg_id::CONFIRM_CARDS,
            Message::ShuffleHand { .. } => msg_id::SHUFFLE_HAND,
            Message::ShuffleSetCard { .. } => msg_id::SHUFFLE_SET_CARD,
            Message::DeckTop { .. } => msg_id::DECK_TOP,
            Message::Move { .. } => msg_id::MOVE,
            Message::PosChange { .. } => msg_id::POS_CHANGE,
            Message::Set { .. } => msg_id::SET,
            Message::Swap { .. } => msg_id::SWAP,
            Message::Summoning { .. } => msg_id::SUMMONING,
            Message::Summoned => msg_id::SUMMONED,
            Message::SpSummoning { .. } => msg_id::SPSUMMONING,
            Message::SpSummoned => msg_id::SPSUMMONED,
            Message::FlipSummoning { .. } => msg_id::FLIPSUMMONING,
            Message::FlipSummoned => msg_id::FLIPSUMMONED,
            Message::Chaining { .. } => msg_id::CHAINING,
            Message::ChainSolving { .. } => msg_id::CHAIN_SOLVING,
            Message::ChainSolved { .. } => msg_id::CHAIN_SOLVED,
            Message::ChainEnd => msg_id::CHAIN_END,
            Message::Draw { .. } => msg_id::DRAW,
            Message::Damage { .. } => msg_id::DAMAGE,
            Message::Recover { .. } => msg_id::RECOVER,
            Message::Equip { .. } => msg_id::EQUIP,
            Message::PayLpCost { .. } => msg_id::PAY_LPCOST,
            Message::RemoveCounter { .. } => msg_id::REMOVE_COUNTER,
            Message::TossCoin { .. } => msg_id::TOSS_COIN,
            Message::TossDice { .. } => msg_id::TOSS_DICE,
            Message::CardHint { .. } => msg_id::CARD_HINT,
        }
    }

    /// Append the wire form of this record to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.id());
        match self {
            Message::Hint {
                hint_type,
                player,
                data,
            } => {
                out.push(*hint_type);
                out.push(player.0);
                put_u64(out, *data);
            }
            Message::ConfirmCards { player, cards } => {
                out.push(player.0);
                put_u32(out, cards.len() as u32);
                for card in cards {
                    put_u32(out, card.code);
                    out.push(card.controller.0);
                    out.push(card.location.to_wire());
                    put_u32(out, card.sequence);
                }
            }
            Message::ShuffleHand { player, codes } => {
                out.push(player.0);
                put_u32(out, codes.len() as u32);
                for code in codes {
                    put_u32(out, *code);
                }
            }
            Message::ShuffleSetCard { location, old, new } => {
                out.push(location.to_wire());
                out.push(old.len() as u8);
                for info in old {
                    info.write(out);
                }
                for info in new {
                    info.write(out);
                }
            }
            Message::DeckTop {
                player,
                offset,
                code,
                position,
            } => {
                out.push(player.0);
                put_u32(out, *offset);
                put_u32(out, *code);
                put_u32(out, position.bits());
            }
            Message::Move {
                code,
                from,
                to,
                reason,
            } => {
                put_u32(out, *code);
                from.write(out);
                to.write(out);
                put_u32(out, reason.bits());
            }
            Message::PosChange {
                code,
                controller,
                location,
                sequence,
                previous,
                current,
            } => {
                put_u32(out, *code);
                out.push(controller.0);
                out.push(location.to_wire());
                out.push(*sequence);
                out.push(previous.bits() as u8);
                out.push(current.bits() as u8);
            }
            Message::Set { code, info }
            | Message::Summoning { code, info }
            | Message::SpSummoning { code, info }
            | Message::FlipSummoning { code, info } => {
                put_u32(out, *code);
                info.write(out);
            }
            Message::Swap {
                code1,
                info1,
                code2,
                info2,
            } => {
                put_u32(out, *code1);
                info1.write(out);
                put_u32(out, *code2);
                info2.write(out);
            }
            Message::Summoned
            | Message::SpSummoned
            | Message::FlipSummoned
            | Message::ChainEnd => {}
            Message::Chaining {
                code,
                info,
                triggering_controller,
                triggering_location,
                triggering_sequence,
                description,
                chain_count,
            } => {
                put_u32(out, *code);
                info.write(out);
                out.push(triggering_controller.0);
                out.push(triggering_location.to_wire());
                put_u32(out, *triggering_sequence);
                put_u64(out, *description);
                put_u32(out, *chain_count);
            }
            Message::ChainSolving { chain_count } | Message::ChainSolved { chain_count } => {
                out.push(*chain_count);
            }
            Message::Draw { player, cards } => {
                out.push(player.0);
                put_u32(out, cards.len() as u32);
                for card in cards {
                    put_u32(out, card.code);
                    put_u32(out, card.position.bits());
                }
            }
            Message::Damage { player, amount, reason } => {
                out.push(player.0);
                put_u32(out, *amount);
                put_u32(out, reason.bits());
            }
            Message::Recover { player, amount } | Message::PayLpCost { player, amount } => {
                out.push(player.0);
                put_u32(out, *amount);
            }
            Message::Equip { equip, target } => {
                equip.write(out);
                target.write(out);
            }
            Message::RemoveCounter {
                counter_type,
                controller,
                location,
                sequence,
                count,
            } => {
                put_u16(out, *counter_type);
                out.push(controller.0);
                out.push(location.to_wire());
                out.push(*sequence);
                put_u16(out, *count);
            }
            Message::TossCoin { player, results } | Message::TossDice { player, results } => {
                out.push(player.0);
                out.push(results.len() as u8);
                out.extend_from_slice(results);
            }
            Message::CardHint {
                info,
                hint_type,
                value,
            } => {
                info.write(out);
                out.push(*hint_type);
                put_u64(out, *value);
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// Append-only message sink.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    records: Vec<Message>,
}

impl MessageLog {
    pub fn push(&mut self, message: Message) {
        self.records.push(message);
    }

    /// Put a record at a position reserved earlier with [`MessageLog::len`].
    pub fn insert(&mut self, index: usize, message: Message) {
        let index = index.min(self.records.len());
        self.records.insert(index, message);
    }

    pub fn records(&self) -> &[Message] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Take every record written so far.
    pub fn drain(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.records)
    }

    /// Concatenated wire form of every record.
    pub fn encode_all(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for record in &self.records {
            record.encode(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_layout() {
        let msg = Message::Damage {
            player: PlayerId::ONE,
            amount: 8_888_888,
            reason: Reason::EFFECT | Reason::BATTLE,
        };
        let bytes = msg.to_bytes();
        assert_eq!(bytes[0], msg_id::DAMAGE);
        assert_eq!(bytes[1], 1);
        assert_eq!(u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]), 8_888_888);
        assert_eq!(
            u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
            (Reason::EFFECT | Reason::BATTLE).bits()
        );
        assert_eq!(bytes.len(), 10);
    }

    #[test]
    fn test_move_layout() {
        let from = LocInfo::new(PlayerId::ZERO, Location::HAND, 2, Position::FACEDOWN_DEFENSE.bits());
        let to = LocInfo::new(PlayerId::ZERO, Location::GRAVE, 0, Position::FACEUP_ATTACK.bits());
        let msg = Message::Move {
            code: 0x0102_0304,
            from,
            to,
            reason: Reason::DESTROY | Reason::EFFECT,
        };
        let bytes = msg.to_bytes();
        assert_eq!(bytes.len(), 1 + 4 + 10 + 10 + 4);
        assert_eq!(&bytes[1..5], &[4, 3, 2, 1]);
        assert_eq!(bytes[5], 0);
        assert_eq!(bytes[6], Location::HAND.to_wire());
        assert_eq!(&bytes[25..29], &[0x41, 0, 0, 0]);
    }

    #[test]
    fn test_pos_change_layout() {
        let msg = Message::PosChange {
            code: 7,
            controller: PlayerId::ONE,
            location: Location::MZONE,
            sequence: 2,
            previous: Position::FACEDOWN_DEFENSE,
            current: Position::FACEUP_ATTACK,
        };
        assert_eq!(msg.to_bytes(), vec![53, 7, 0, 0, 0, 1, 4, 2, 8, 1]);
    }

    #[test]
    fn test_toss_layout() {
        let msg = Message::TossDice {
            player: PlayerId::ZERO,
            results: vec![3, 6],
        };
        assert_eq!(msg.to_bytes(), vec![131, 0, 2, 3, 6]);
    }

    #[test]
    fn test_log_drain() {
        let mut log = MessageLog::default();
        log.push(Message::ChainEnd);
        log.push(Message::Summoned);
        assert_eq!(log.encode_all(), vec![74, 61]);
        assert_eq!(log.drain().len(), 2);
        assert!(log.is_empty());
    }
}
