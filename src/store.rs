use tracing::{info, warn};

use crate::model::{self, Dataset};
use crate::seed;
use crate::storage::{KeyValueStorage, StoreError};

pub const STORAGE_KEY: &str = "campus_bridge_attendance";

/// Whole-dataset persistence. Callers read everything, mutate in memory and
/// write everything back; there is no write coordination between processes.
pub trait RecordStore {
    fn load(&self) -> Result<Dataset, StoreError>;
    fn save(&self, dataset: &Dataset) -> Result<(), StoreError>;
}

pub struct LocalRecordStore<S: KeyValueStorage> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> LocalRecordStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            key: STORAGE_KEY.to_string(),
        }
    }

    #[cfg(test)]
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    fn seed(&self) -> Result<Dataset, StoreError> {
        let now = model::now_millis();
        let mut dataset = seed::generate(now.date_naive(), now, &mut rand::rng());
        self.save_as_is(&mut dataset)?;
        info!(
            key = %self.key,
            records = dataset.attendance_records.len(),
            "seeded sample attendance dataset"
        );
        Ok(dataset)
    }

    fn save_as_is(&self, dataset: &mut Dataset) -> Result<(), StoreError> {
        dataset.version += 1;
        let raw = serde_json::to_string(&*dataset)?;
        self.storage.set_item(&self.key, &raw)
    }
}

impl<S: KeyValueStorage> RecordStore for LocalRecordStore<S> {
    fn load(&self) -> Result<Dataset, StoreError> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            return self.seed();
        };
        match serde_json::from_str::<Dataset>(&raw) {
            Ok(dataset) => Ok(dataset),
            Err(e) => {
                warn!(key = %self.key, error = %e, "stored dataset unreadable, reseeding");
                self.seed()
            }
        }
    }

    fn save(&self, dataset: &Dataset) -> Result<(), StoreError> {
        let mut next = dataset.clone();
        self.save_as_is(&mut next)
    }
}
