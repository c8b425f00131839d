/// Source of node identifiers for newly added nodes.
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> String;
}

/// `"<unix-millis>-<random>"` ids.
///
/// The random discriminator keeps ids distinct when several nodes are added within the same
/// millisecond.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampIdGenerator;

impl IdGenerator for TimestampIdGenerator {
    fn next_id(&mut self) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        format!("{millis}-{}", uuid::Uuid::new_v4().simple())
    }
}

/// Deterministic `"<prefix><n>"` ids, starting at 1.
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: u64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("n")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}
