use crate::types::TOTAL_LOCKS;

/// The eight hub semaphores.
///
/// Checkout (`available`) and value (`state`) are independent: returning a
/// lock to the pool keeps whatever value it last held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTable {
    available: [bool; TOTAL_LOCKS],
    state: [bool; TOTAL_LOCKS],
}

impl LockTable {
    pub fn new() -> Self {
        LockTable {
            available: [true; TOTAL_LOCKS],
            state: [false; TOTAL_LOCKS],
        }
    }

    /// Return every lock to the pool and clear every value.
    pub fn reset(&mut self) {
        self.available = [true; TOTAL_LOCKS];
        self.state = [false; TOTAL_LOCKS];
    }

    /// Check out the lowest free lock.
    pub fn checkout(&mut self) -> Option<usize> {
        let id = self.available.iter().position(|&free| free)?;
        self.available[id] = false;
        Some(id)
    }

    /// Put a lock back in the pool. Only the low three bits of `id` are used.
    pub fn release(&mut self, id: u32) {
        self.available[Self::index(id)] = true;
    }

    /// Write a lock's value and return what it held before.
    pub fn write(&mut self, id: u32, value: bool) -> bool {
        let index = Self::index(id);
        std::mem::replace(&mut self.state[index], value)
    }

    pub fn is_available(&self, id: u32) -> bool {
        self.available[Self::index(id)]
    }

    pub fn is_set(&self, id: u32) -> bool {
        self.state[Self::index(id)]
    }

    /// Lock values as a bitmap, bit `n` for lock `n`.
    pub fn state_bits(&self) -> u8 {
        Self::pack(&self.state)
    }

    /// Free locks as a bitmap, bit `n` for lock `n`.
    pub fn available_bits(&self) -> u8 {
        Self::pack(&self.available)
    }

    fn pack(flags: &[bool; TOTAL_LOCKS]) -> u8 {
        flags
            .iter()
            .enumerate()
            .fold(0, |bits, (i, &flag)| bits | (u8::from(flag) << i))
    }

    fn index(id: u32) -> usize {
        (id & 0x7) as usize
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_in_order() {
        let mut locks = LockTable::new();
        for expected in 0..TOTAL_LOCKS {
            assert_eq!(locks.checkout(), Some(expected));
        }
        assert_eq!(locks.checkout(), None);
        assert_eq!(locks.available_bits(), 0);
    }

    #[test]
    fn test_release_reuses_lowest() {
        let mut locks = LockTable::new();
        for _ in 0..4 {
            locks.checkout();
        }
        locks.release(1);
        assert_eq!(locks.checkout(), Some(1));
        assert_eq!(locks.checkout(), Some(4));
    }

    #[test]
    fn test_write_returns_previous() {
        let mut locks = LockTable::new();
        assert!(!locks.write(3, true));
        assert!(locks.write(3, true));
        assert!(locks.write(3, false));
        assert!(!locks.is_set(3));
    }

    #[test]
    fn test_release_keeps_value() {
        let mut locks = LockTable::new();
        let id = locks.checkout().unwrap_or_default() as u32;
        locks.write(id, true);
        locks.release(id);
        assert!(locks.is_available(id));
        assert!(locks.is_set(id));
        assert_eq!(locks.checkout(), Some(id as usize));
        assert!(locks.is_set(id));
    }

    #[test]
    fn test_index_masks_to_three_bits() {
        let mut locks = LockTable::new();
        locks.write(0x0F, true);
        assert!(locks.is_set(7));
        assert_eq!(locks.state_bits(), 0x80);
    }

    #[test]
    fn test_reset() {
        let mut locks = LockTable::new();
        locks.checkout();
        locks.write(0, true);
        locks.reset();
        assert_eq!(locks.available_bits(), 0xFF);
        assert_eq!(locks.state_bits(), 0);
    }
}
