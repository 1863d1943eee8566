use crate::ids::CardId;

const SLOTS: usize = 8;

/// Integer result slots passed from a finished child (or a player's answer)
/// to the frame that resumes next. Overwritten freely; nothing here survives
/// beyond the next reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Returns {
    slots: [i64; SLOTS],
}

impl Returns {
    pub fn set(&mut self, slot: usize, value: i64) {
        if let Some(s) = self.slots.get_mut(slot) {
            *s = value;
        }
    }

    pub fn set_bool(&mut self, slot: usize, value: bool) {
        self.set(slot, i64::from(value));
    }

    pub fn get(&self, slot: usize) -> i64 {
        self.slots.get(slot).copied().unwrap_or(0)
    }

    pub fn get_i32(&self, slot: usize) -> i32 {
        self.get(slot) as i32
    }

    pub fn get_bool(&self, slot: usize) -> bool {
        self.get(slot) != 0
    }

    pub fn clear(&mut self) {
        self.slots = [0; SLOTS];
    }
}

/// Card list answer of a card selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnCards {
    pub list: Vec<CardId>,
    /// Per-card amounts for counter distribution answers.
    pub counts: Vec<u16>,
    pub canceled: bool,
}

impl ReturnCards {
    pub fn set(&mut self, list: Vec<CardId>) {
        self.list = list;
        self.counts.clear();
        self.canceled = false;
    }

    pub fn cancel(&mut self) {
        self.list.clear();
        self.counts.clear();
        self.canceled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_slots_read_zero() {
        let mut r = Returns::default();
        r.set(100, 5);
        assert_eq!(r.get(100), 0);
        r.set(1, -3);
        assert_eq!(r.get_i32(1), -3);
        assert!(r.get_bool(1));
    }

    #[test]
    fn test_cancel_clears_list() {
        let mut rc = ReturnCards::default();
        rc.set(vec![CardId(1)]);
        rc.cancel();
        assert!(rc.canceled);
        assert!(rc.list.is_empty());
    }
}
