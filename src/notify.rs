use rand::Rng;
use tokio::sync::broadcast;

pub const RECYCLING_TIPS: [&str; 5] = [
    "Did you know? Recycling one aluminum can saves enough energy to run a TV for 3 hours!",
    "Plastic bottles can take up to 450 years to decompose in landfills.",
    "Glass can be recycled endlessly without losing quality or purity!",
    "Paper can be recycled 5 to 7 times before the fibers become too short.",
    "Recycling helps reduce greenhouse gas emissions and saves energy!",
];

/// User-facing event. Every notification carries a random recycling tip for
/// the UI to append.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub tip: &'static str,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        let tip = RECYCLING_TIPS[rand::rng().random_range(0..RECYCLING_TIPS.len())];
        Self {
            message: message.into(),
            tip,
        }
    }

    pub fn item_found(label: &str, points: u64) -> Self {
        Self::new(format!("Found {label}! +{points} points"))
    }
}

/// Broadcast fan-out for notifications. Publishing never blocks and never
/// fails the publisher; with no subscribers the event is simply dropped.
#[derive(Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<Notification>,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(16)
    }
}
