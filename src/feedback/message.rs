use tokio::time::Instant;
use uuid::Uuid;

use crate::situation::Priority;

/// A piece of guidance waiting to be spoken. Immutable once created.
#[derive(Debug, Clone)]
pub struct Message {
    id: Uuid,
    text: String,
    enqueued_at: Instant,
    priority: Priority,
}

impl Message {
    pub fn new(text: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            enqueued_at: Instant::now(),
            priority,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn is_high(&self) -> bool {
        self.priority == Priority::High
    }
}
