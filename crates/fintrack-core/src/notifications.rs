//! Notification queue with scheduled expiry
//!
//! Every auto-removing notification owns one entry in a timer table keyed by
//! its id. Dismissing a notification aborts its timer, so no expiry ever
//! fires for a notification that is already gone.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::types::NotificationKind;

/// Default lifetime of an auto-removing notification
pub const DEFAULT_EXPIRY: Duration = Duration::from_millis(5000);

/// A transient, user-facing status message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub auto_remove: bool,
    pub created_at: DateTime<Utc>,
}

/// Optional settings for [`NotificationCenter::notify`]
#[derive(Debug, Clone, PartialEq)]
pub struct NotifyOptions {
    pub title: Option<String>,
    pub auto_remove: bool,
}

impl Default for NotifyOptions {
    fn default() -> Self {
        Self {
            title: None,
            auto_remove: true,
        }
    }
}

impl NotifyOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Keep the notification until it is dismissed
    pub fn sticky(mut self) -> Self {
        self.auto_remove = false;
        self
    }
}

#[derive(Debug)]
struct Queue {
    next_id: u64,
    items: Vec<Notification>,
    timers: HashMap<u64, JoinHandle<()>>,
}

impl Default for Queue {
    fn default() -> Self {
        Self {
            next_id: 1,
            items: Vec::new(),
            timers: HashMap::new(),
        }
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}

fn lock(queue: &Mutex<Queue>) -> MutexGuard<'_, Queue> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered notification queue; clones share the same queue
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    queue: Arc<Mutex<Queue>>,
    expiry: Duration,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY)
    }
}

impl NotificationCenter {
    pub fn new(expiry: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Queue::default())),
            expiry,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Append a notification and schedule its expiry; returns its id.
    ///
    /// Identical messages are not merged. Expiry needs a tokio runtime; without
    /// one the notification stays until dismissed.
    pub fn notify(&self, kind: NotificationKind, message: impl Into<String>, options: NotifyOptions) -> u64 {
        let mut queue = lock(&self.queue);
        let id = queue.next_id;
        queue.next_id += 1;

        let notification = Notification {
            id,
            kind,
            message: message.into(),
            title: options.title,
            auto_remove: options.auto_remove,
            created_at: Utc::now(),
        };
        log::debug!("Notification {} [{}]: {}", id, kind, notification.message);
        queue.items.push(notification);

        if options.auto_remove {
            match Handle::try_current() {
                Ok(handle) => {
                    let timer = handle.spawn(expire(Arc::downgrade(&self.queue), id, self.expiry));
                    queue.timers.insert(id, timer);
                }
                Err(_) => log::warn!("No async runtime; notification {} will not expire", id),
            }
        }
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.notify(NotificationKind::Success, message, NotifyOptions::default())
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.notify(NotificationKind::Error, message, NotifyOptions::default())
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.notify(NotificationKind::Warning, message, NotifyOptions::default())
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.notify(NotificationKind::Info, message, NotifyOptions::default())
    }

    /// Remove a notification now and cancel its pending expiry
    pub fn dismiss(&self, id: u64) -> bool {
        let mut queue = lock(&self.queue);
        if let Some(timer) = queue.timers.remove(&id) {
            timer.abort();
        }
        let before = queue.items.len();
        queue.items.retain(|n| n.id != id);
        queue.items.len() != before
    }

    /// Remove every notification and cancel every pending expiry
    pub fn clear(&self) {
        let mut queue = lock(&self.queue);
        for (_, timer) in queue.timers.drain() {
            timer.abort();
        }
        queue.items.clear();
    }

    /// Queued notifications in insertion order
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.queue).items.clone()
    }

    pub fn get(&self, id: u64) -> Option<Notification> {
        lock(&self.queue).items.iter().find(|n| n.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.queue).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of scheduled expiries not yet fired or cancelled
    pub fn pending_expiries(&self) -> usize {
        lock(&self.queue).timers.len()
    }
}

async fn expire(queue: Weak<Mutex<Queue>>, id: u64, after: Duration) {
    tokio::time::sleep(after).await;
    if let Some(queue) = queue.upgrade() {
        let mut queue = lock(&queue);
        queue.timers.remove(&id);
        queue.items.retain(|n| n.id != id);
        log::debug!("Notification {} expired", id);
    }
}
