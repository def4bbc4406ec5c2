use chrono::Utc;

/// Hands out time-based shape ids that never repeat within one editor,
/// even when two shapes start in the same millisecond.
#[derive(Debug, Default, Clone)]
pub struct ShapeIdGenerator {
    last: u64,
}

impl ShapeIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after ids that are already in use.
    pub fn after(last: u64) -> Self {
        Self { last }
    }

    pub fn next_id(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.last = now.max(self.last + 1);
        self.last
    }
}
