//! Resumable round-robin position over the channel list.

use serde::{Deserialize, Serialize};

/// Index of the next channel due for a low-priority refresh.
///
/// Always lies in `[0, len)` (or is 0 for an empty list) and wraps
/// modulo `len`. Serializable so the position can be saved and restored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRobinCursor {
    position: usize,
    len: usize,
}

impl RoundRobinCursor {
    pub fn new(len: usize) -> Self {
        Self { position: 0, len }
    }

    /// Restore a saved position, wrapping it into range.
    pub fn restore(position: usize, len: usize) -> Self {
        let position = if len == 0 { 0 } else { position % len };
        Self { position, len }
    }

    pub fn current(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn advance(&mut self) {
        if self.len > 0 {
            self.position = (self.position + 1) % self.len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_around() {
        let mut cursor = RoundRobinCursor::restore(8, 10);
        for _ in 0..3 {
            cursor.advance();
        }
        assert_eq!(cursor.current(), 1);
    }

    #[test]
    fn test_restore_wraps_out_of_range() {
        assert_eq!(RoundRobinCursor::restore(23, 10).current(), 3);
        assert_eq!(RoundRobinCursor::restore(5, 0).current(), 0);
    }

    #[test]
    fn test_empty_cursor_does_not_move() {
        let mut cursor = RoundRobinCursor::new(0);
        cursor.advance();
        assert_eq!(cursor.current(), 0);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_serde_roundtrip() {
        let cursor = RoundRobinCursor::restore(4, 7);
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, r#"{"position":4,"len":7}"#);
        let restored: RoundRobinCursor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cursor);
    }
}
