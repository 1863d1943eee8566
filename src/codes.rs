//! Numeric codes shared with card scripts and clients: effect codes, event
//! codes, hint kinds and well-known hint/prompt strings.

/// Effect codes (what an effect modifies).
pub mod effect {
    pub const IMMUNE_EFFECT: u32 = 1;
    pub const DISABLE: u32 = 2;
    pub const CANNOT_DISABLE: u32 = 3;
    pub const SET_CONTROL: u32 = 4;
    pub const CANNOT_CHANGE_CONTROL: u32 = 5;
    pub const CANNOT_ACTIVATE: u32 = 6;
    pub const CANNOT_TRIGGER: u32 = 7;
    pub const CANNOT_CHANGE_POSITION: u32 = 14;
    pub const CANNOT_CHANGE_POS_E: u32 = 19;
    pub const CANNOT_SUMMON: u32 = 20;
    pub const CANNOT_FLIP_SUMMON: u32 = 21;
    pub const CANNOT_SPECIAL_SUMMON: u32 = 22;
    pub const CANNOT_MSET: u32 = 23;
    pub const CANNOT_SSET: u32 = 24;
    pub const CANNOT_DRAW: u32 = 25;
    pub const CANNOT_DISABLE_SUMMON: u32 = 26;
    pub const CANNOT_DISABLE_SPSUMMON: u32 = 27;
    pub const SET_SUMMON_COUNT_LIMIT: u32 = 28;
    pub const EXTRA_SUMMON_COUNT: u32 = 29;
    pub const SPSUMMON_CONDITION: u32 = 30;
    pub const REVIVE_LIMIT: u32 = 31;
    pub const SUMMON_PROC: u32 = 32;
    pub const LIMIT_SUMMON_PROC: u32 = 33;
    pub const SPSUMMON_PROC: u32 = 34;
    pub const EXTRA_SET_COUNT: u32 = 35;
    pub const SET_PROC: u32 = 36;
    pub const LIMIT_SET_PROC: u32 = 37;
    pub const DEVINE_LIGHT: u32 = 38;
    pub const CANNOT_DISABLE_FLIP_SUMMON: u32 = 39;
    pub const INDESTRUCTABLE: u32 = 40;
    pub const INDESTRUCTABLE_EFFECT: u32 = 41;
    pub const INDESTRUCTABLE_BATTLE: u32 = 42;
    pub const UNRELEASABLE_SUM: u32 = 43;
    pub const UNRELEASABLE_NONSUM: u32 = 44;
    pub const DESTROY_SUBSTITUTE: u32 = 45;
    pub const CANNOT_RELEASE: u32 = 46;
    pub const INDESTRUCTABLE_COUNT: u32 = 47;
    pub const UNRELEASABLE_EFFECT: u32 = 48;
    pub const DESTROY_REPLACE: u32 = 50;
    pub const RELEASE_REPLACE: u32 = 51;
    pub const SEND_REPLACE: u32 = 52;
    pub const CANNOT_DISCARD_HAND: u32 = 55;
    pub const CANNOT_DISCARD_DECK: u32 = 56;
    pub const LEAVE_FIELD_REDIRECT: u32 = 60;
    pub const TO_HAND_REDIRECT: u32 = 61;
    pub const TO_DECK_REDIRECT: u32 = 62;
    pub const TO_GRAVE_REDIRECT: u32 = 63;
    pub const REMOVE_REDIRECT: u32 = 64;
    pub const CANNOT_TO_HAND: u32 = 65;
    pub const CANNOT_TO_DECK: u32 = 66;
    pub const CANNOT_REMOVE: u32 = 67;
    pub const CANNOT_TO_GRAVE: u32 = 68;
    pub const CANNOT_TURN_SET: u32 = 69;
    pub const PUBLIC: u32 = 160;
    pub const REVERSE_DAMAGE: u32 = 80;
    pub const REVERSE_RECOVER: u32 = 81;
    pub const CHANGE_DAMAGE: u32 = 82;
    pub const REFLECT_DAMAGE: u32 = 83;
    pub const CHANGE_RECOVER: u32 = 84;
    pub const CANNOT_LOSE_LP: u32 = 85;
    pub const SUMMON_COST: u32 = 90;
    pub const SPSUMMON_COST: u32 = 91;
    pub const FLIPSUMMON_COST: u32 = 92;
    pub const MSET_COST: u32 = 93;
    pub const SSET_COST: u32 = 94;
    pub const ADD_CODE: u32 = 113;
    pub const CHANGE_CODE: u32 = 114;
    pub const ADD_TYPE: u32 = 115;
    pub const REMOVE_TYPE: u32 = 116;
    pub const CHANGE_TYPE: u32 = 117;
    pub const DECREASE_TRIBUTE: u32 = 150;
    pub const DECREASE_TRIBUTE_SET: u32 = 151;
    pub const EXTRA_RELEASE: u32 = 153;
    pub const TRIBUTE_LIMIT: u32 = 154;
    pub const EXTRA_RELEASE_SUM: u32 = 155;
    pub const EXTRA_RELEASE_NONSUM: u32 = 158;
    pub const LPCOST_CHANGE: u32 = 170;
    pub const LPCOST_REPLACE: u32 = 171;
    pub const DEFENSE_ATTACK: u32 = 190;
    pub const MATCH_KILL: u32 = 196;
    pub const SELF_DESTROY: u32 = 141;
    pub const SELF_TOGRAVE: u32 = 142;
    pub const UNIQUE_CHECK: u32 = 297;
    pub const TOSS_COIN_REPLACE: u32 = 220;
    pub const TOSS_DICE_REPLACE: u32 = 221;
    pub const TOSS_COIN_CHOOSE: u32 = 222;
    pub const TOSS_DICE_CHOOSE: u32 = 223;
    pub const FORCE_SPSUMMON_POSITION: u32 = 228;
    pub const FORCE_NORMAL_SUMMON_POSITION: u32 = 229;
    pub const MONSTER_SSET: u32 = 18;
    pub const GEMINI_STATUS: u32 = 75;
    pub const GEMINI_SUMMONABLE: u32 = 76;
    pub const UNSUMMONABLE_CARD: u32 = 77;
    pub const SPSUMMON_PROC_G: u32 = 320;
    pub const PRE_MONSTER: u32 = 250;
    pub const USE_EXTRA_MZONE: u32 = 261;
    pub const USE_EXTRA_SZONE: u32 = 262;
    pub const MUST_USE_MZONE: u32 = 265;
    pub const IMMUNE_OVERLAY: u32 = 270;
    pub const TO_GRAVE_REDIRECT_CB: u32 = 313;
    pub const ADD_SETCODE: u32 = 334;
    pub const GOD_IMMUNE: u32 = 600;
    pub const ULTIMATE_IMMUNE: u32 = 601;
    /// Player effect: this player's spell/trap cards may occupy monster zones.
    pub const ORICA: u32 = 610;
    /// Card is acting as a monster while in the spell/trap zone.
    pub const ORICA_SZONE: u32 = 611;
    /// Player effect: this player's monsters may occupy spell/trap zones.
    pub const SANCT: u32 = 612;
    /// Card is acting as a spell/trap while in a monster zone.
    pub const SANCT_MZONE: u32 = 613;
    pub const OVERLAY_REMOVE_REPLACE: u32 = 0x10000000;
    pub const RCOUNTER_REPLACE: u32 = 0x20000000;
}

/// Event codes (what happened).
pub mod event {
    pub const FLIP: u32 = 1001;
    pub const FREE_CHAIN: u32 = 1002;
    pub const DESTROY: u32 = 1010;
    pub const REMOVE: u32 = 1011;
    pub const TO_HAND: u32 = 1012;
    pub const TO_DECK: u32 = 1013;
    pub const TO_GRAVE: u32 = 1014;
    pub const LEAVE_FIELD: u32 = 1015;
    pub const CHANGE_POS: u32 = 1016;
    pub const RELEASE: u32 = 1017;
    pub const DISCARD: u32 = 1018;
    pub const LEAVE_FIELD_P: u32 = 1019;
    pub const CHAIN_SOLVING: u32 = 1020;
    pub const CHAIN_SOLVED: u32 = 1022;
    pub const CHAIN_END: u32 = 1026;
    pub const CHAINING: u32 = 1027;
    pub const DESTROYED: u32 = 1029;
    pub const MOVE: u32 = 1030;
    pub const LEAVE_GRAVE: u32 = 1031;
    pub const ADJUST: u32 = 1040;
    pub const SUMMON_SUCCESS: u32 = 1100;
    pub const FLIP_SUMMON_SUCCESS: u32 = 1101;
    pub const SPSUMMON_SUCCESS: u32 = 1102;
    pub const SUMMON: u32 = 1103;
    pub const FLIP_SUMMON: u32 = 1104;
    pub const SPSUMMON: u32 = 1105;
    pub const MSET: u32 = 1106;
    pub const SSET: u32 = 1107;
    pub const BE_MATERIAL: u32 = 1108;
    pub const BE_PRE_MATERIAL: u32 = 1109;
    pub const DRAW: u32 = 1110;
    pub const DAMAGE: u32 = 1111;
    pub const RECOVER: u32 = 1112;
    pub const SUMMON_NEGATED: u32 = 1114;
    pub const FLIP_SUMMON_NEGATED: u32 = 1115;
    pub const SPSUMMON_NEGATED: u32 = 1116;
    pub const PRESPSUMMON_SUCCESS: u32 = 1117;
    pub const CONTROL_CHANGED: u32 = 1120;
    pub const EQUIP: u32 = 1121;
    pub const BATTLE_DAMAGE: u32 = 1143;
    pub const TOSS_DICE: u32 = 1150;
    pub const TOSS_COIN: u32 = 1151;
    pub const TOSS_COIN_NEGATE: u32 = 1152;
    pub const TOSS_DICE_NEGATE: u32 = 1153;
    pub const PAY_LPCOST: u32 = 1201;
    pub const DETACH_MATERIAL: u32 = 1202;
    pub const ZERO_LP: u32 = 1210;
    pub const ADD_COUNTER: u32 = 0x10000;
    pub const REMOVE_COUNTER: u32 = 0x20000;
}

/// Redirect values combining `DECK` with a sequence request.
pub mod redirect {
    pub const DECK_BOTTOM: u32 = 0x10001;
    pub const DECK_SHUFFLE: u32 = 0x20001;
}

/// `Hint` record kinds.
pub mod hint {
    pub const EVENT: u8 = 1;
    pub const MESSAGE: u8 = 2;
    pub const SELECTMSG: u8 = 3;
    pub const OPSELECTED: u8 = 4;
    pub const EFFECT: u8 = 5;
    pub const CARD: u8 = 10;
}

/// Prompt/description ids referenced by selection requests.
pub mod prompt {
    /// "Summon with the normal procedure?"
    pub const TRIBUTE_SUMMON: u64 = 90;
    /// "Move to the spell & trap zone instead?" (crystal beast redirect)
    pub const CB_REDIRECT: u64 = 97;
    /// Default "pay life points" option.
    pub const PAY_LP: u64 = 11;
    /// Default "remove counter" option.
    pub const REMOVE_COUNTER: u64 = 10;
    /// Default "detach material" option.
    pub const REMOVE_OVERLAY: u64 = 12;
    /// Yes/no when a single life point cost replacement exists.
    pub const LPCOST_REPLACE: u64 = 218;
    pub const OVERLAY_REPLACE: u64 = 219;
    pub const COUNTER_REPLACE: u64 = 220;
    /// "Select the cards to tribute."
    pub const RELEASE: u64 = 500;
    /// "Select the cards that cannot change control."
    pub const CONTROL_DENY: u64 = 502;
    /// "Select the materials to detach."
    pub const DETACH: u64 = 519;
    /// "Select the unique card to keep."
    pub const UNIQUE_KEEP: u64 = 534;
    /// "Select the card to destroy."
    pub const DESTROY: u64 = 502;
    /// Client hint: card is controlled by a player other than its owner.
    pub const NOT_OWNER_HAND: u64 = 67;
    /// Client hint: added to hand by the resolving effect.
    pub const ADDED_BY_CHAIN: u64 = 225;
}

/// Sentinel reported for extreme life point amounts.
pub const LP_SENTINEL: i32 = 8_888_888;
/// Amounts above this are treated as "infinite".
pub const LP_THRESHOLD: u32 = 2_000_000;
/// Coin results.
pub const COIN_HEADS: u8 = 1;
pub const COIN_TAILS: u8 = 0;
