use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::WishError;

const ID_LEN: usize = 8;

/// A submitted wish. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WishRecord {
    pub name: String,
    pub wish: String,
    pub created_at: SystemTime,
}

#[derive(Debug)]
struct Entry {
    record: WishRecord,
    generation: u64,
}

/// A pending one-shot expiry. `generation` pins it to the record it was scheduled for.
#[derive(Debug)]
struct Scheduled {
    deadline: Instant,
    id: String,
    generation: u64,
}

#[derive(Debug)]
struct Inner {
    records: HashMap<String, Entry>,
    // ttl is fixed, so deadlines are pushed in order
    schedule: VecDeque<Scheduled>,
    next_generation: u64,
    ttl: Duration,
}

/// Thread-safe wish store shared by the request handlers.
/// Cloning hands out another handle to the same map.
#[derive(Debug, Clone)]
pub struct WishStore(Arc<Mutex<Inner>>);

impl WishStore {
    /// Create an empty store whose records expire `ttl` after creation.
    pub fn new(ttl: Duration) -> Self {
        WishStore(Arc::new(Mutex::new(Inner {
            records: HashMap::new(),
            schedule: VecDeque::new(),
            next_generation: 0,
            ttl,
        })))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // every operation finishes its mutation before releasing, so a poisoned map is still consistent
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a new wish and schedule its expiry. Returns the generated id.
    pub fn create(&self, name: &str, wish: &str) -> Result<String, WishError> {
        if name.is_empty() {
            return Err(WishError::Validation("name".to_string()));
        }
        if wish.is_empty() {
            return Err(WishError::Validation("wish".to_string()));
        }

        let id = generate_id();
        let record = WishRecord {
            name: name.to_string(),
            wish: wish.to_string(),
            created_at: SystemTime::now(),
        };

        let mut inner = self.lock();
        let generation = inner.next_generation;
        inner.next_generation += 1;
        let deadline = Instant::now().checked_add(inner.ttl);
        inner.records.insert(id.clone(), Entry { record, generation });
        // a ttl past the clock's range means the wish only leaves by burning
        if let Some(deadline) = deadline {
            inner.schedule.push_back(Scheduled {
                deadline,
                id: id.clone(),
                generation,
            });
        }
        Ok(id)
    }

    /// Delete a wish right away. The pending expiry for it turns into a no-op.
    pub fn burn(&self, id: &str) -> Result<(), WishError> {
        match self.lock().records.remove(id) {
            Some(_) => Ok(()),
            None => Err(WishError::NotFound),
        }
    }

    pub fn get(&self, id: &str) -> Result<WishRecord, WishError> {
        self.lock()
            .records
            .get(id)
            .map(|entry| entry.record.clone())
            .ok_or(WishError::NotFound)
    }

    /// Fire the expiry for `id` immediately. Returns whether a record was removed.
    pub fn expire(&self, id: &str) -> bool {
        self.lock().records.remove(id).is_some()
    }

    /// Run every scheduled expiry due at `now`. Returns how many records were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut inner = self.lock();
        let mut removed = 0;
        while inner.schedule.front().is_some_and(|s| s.deadline <= now) {
            let Some(due) = inner.schedule.pop_front() else {
                break;
            };
            // a burned id may have been handed out again since; leave the newer record alone
            let current = inner
                .records
                .get(&due.id)
                .is_some_and(|entry| entry.generation == due.generation);
            if current {
                inner.records.remove(&due.id);
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Start the background thread that applies scheduled expiries every `interval`.
pub fn spawn_sweeper(store: WishStore, interval: Duration) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            thread::sleep(interval);
            let removed = store.sweep(Instant::now());
            if removed > 0 {
                info!(removed, remaining = store.len(), "expired wishes");
            } else {
                debug!("sweep found nothing due");
            }
        }
    })
}

/// First 8 hex digits of a v4 UUID, uppercased.
fn generate_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(ID_LEN);
    id.make_ascii_uppercase();
    id
}
