use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Device, DeviceStatus};

const MAX_ID_ATTEMPTS: usize = 16;

/// Source of opaque identifiers for new devices.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[derive(Default)]
struct RegistryState {
    devices: Vec<Device>,
    index: HashMap<String, usize>,
    // Every identifier ever handed out, both ids and external codes.
    issued: HashSet<String>,
}

impl RegistryState {
    fn allocate(&mut self, ids: &dyn IdGenerator) -> Result<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = ids.generate();
            if !candidate.is_empty() && self.issued.insert(candidate.clone()) {
                return Ok(candidate);
            }
            tracing::warn!(candidate = %candidate, "Identifier collision, regenerating");
        }

        Err(AppError::Internal(format!(
            "Failed to allocate a unique identifier after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }
}

/// In-memory device registry.
///
/// Constructed once at startup and shared by cloning; clones point at the same
/// map. Nothing is persisted, all devices are lost when the process exits.
#[derive(Clone)]
pub struct DeviceRegistry {
    state: Arc<RwLock<RegistryState>>,
    ids: Arc<dyn IdGenerator>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(UuidGenerator))
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
            ids,
        }
    }

    /// Register a new device and return the stored record.
    pub async fn create(
        &self,
        name: &str,
        device_type: &str,
        status: DeviceStatus,
    ) -> Result<Device> {
        if name.is_empty() {
            return Err(AppError::InvalidInput("Device name is required".to_string()));
        }
        if device_type.is_empty() {
            return Err(AppError::InvalidInput("Device type is required".to_string()));
        }

        let mut state = self.state.write().await;

        let id = state.allocate(self.ids.as_ref())?;
        let external_code = state.allocate(self.ids.as_ref())?;

        let device = Device {
            id: id.clone(),
            external_code,
            name: name.to_string(),
            device_type: device_type.to_string(),
            status,
            last_updated: next_timestamp(None),
        };

        let position = state.devices.len();
        state.devices.push(device.clone());
        state.index.insert(id, position);

        tracing::info!(
            device_id = %device.id,
            device_code = %device.external_code,
            status = %device.status,
            "Device registered"
        );

        Ok(device)
    }

    /// All devices in registration order, optionally narrowed to one status.
    pub async fn find_all(&self, status: Option<DeviceStatus>) -> Vec<Device> {
        let state = self.state.read().await;

        state
            .devices
            .iter()
            .filter(|device| status.map_or(true, |s| device.status == s))
            .cloned()
            .collect()
    }

    pub async fn find_by_id(&self, id: &str) -> Option<Device> {
        let state = self.state.read().await;
        let device = state.index.get(id).map(|&i| state.devices[i].clone());

        tracing::debug!(device_id = %id, found = device.is_some(), "Device lookup");
        device
    }

    /// Overwrite a device's status. Returns `None` when the id is unknown.
    pub async fn update_status(&self, id: &str, status: DeviceStatus) -> Option<Device> {
        let mut state = self.state.write().await;
        let position = *state.index.get(id)?;

        let current = &state.devices[position];
        let updated = Device {
            status,
            last_updated: next_timestamp(Some(current.last_updated)),
            ..current.clone()
        };
        state.devices[position] = updated.clone();

        tracing::info!(device_id = %id, status = %status, "Device status updated");
        Some(updated)
    }

    pub async fn count(&self) -> usize {
        self.state.read().await.devices.len()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock time, nudged forward when it has not moved past `previous`.
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Cycles through a fixed list of identifiers.
    struct ScriptedIds {
        values: Vec<&'static str>,
        next: Mutex<usize>,
    }

    impl ScriptedIds {
        fn new(values: Vec<&'static str>) -> Self {
            Self {
                values,
                next: Mutex::new(0),
            }
        }
    }

    impl IdGenerator for ScriptedIds {
        fn generate(&self) -> String {
            let mut next = self.next.lock().unwrap();
            let value = self.values[*next % self.values.len()];
            *next += 1;
            value.to_string()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_distinct_identifiers() {
        let registry = DeviceRegistry::new();
        let before = Utc::now();

        let device = registry
            .create("Lab Analyzer Alpha", "Blood Analyzer", DeviceStatus::Online)
            .await
            .unwrap();

        assert!(!device.id.is_empty());
        assert!(!device.external_code.is_empty());
        assert_ne!(device.id, device.external_code);
        assert_eq!(device.name, "Lab Analyzer Alpha");
        assert_eq!(device.device_type, "Blood Analyzer");
        assert_eq!(device.status, DeviceStatus::Online);
        assert!(device.last_updated >= before);
        assert!(device.last_updated <= Utc::now());
    }

    #[tokio::test]
    async fn test_identical_inputs_produce_unique_devices() {
        let registry = DeviceRegistry::new();

        let first = registry
            .create("Centrifuge", "Sample Prep", DeviceStatus::Offline)
            .await
            .unwrap();
        let second = registry
            .create("Centrifuge", "Sample Prep", DeviceStatus::Offline)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_ne!(first.external_code, second.external_code);
        assert_eq!(registry.count().await, 2);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name_and_type() {
        let registry = DeviceRegistry::new();

        let result = registry.create("", "Analyzer", DeviceStatus::Online).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let result = registry.create("Analyzer", "", DeviceStatus::Online).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_create_keeps_whitespace_names_verbatim() {
        let registry = DeviceRegistry::new();

        let device = registry
            .create(" ", "T", DeviceStatus::Online)
            .await
            .unwrap();

        assert_eq!(device.name, " ");
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_collisions_are_regenerated() {
        // "a" is repeated, so the second device must skip past it.
        let ids = Arc::new(ScriptedIds::new(vec!["a", "b", "a", "b", "c", "d"]));
        let registry = DeviceRegistry::with_id_generator(ids);

        let first = registry
            .create("One", "Type", DeviceStatus::Online)
            .await
            .unwrap();
        let second = registry
            .create("Two", "Type", DeviceStatus::Online)
            .await
            .unwrap();

        assert_eq!(first.id, "a");
        assert_eq!(first.external_code, "b");
        assert_eq!(second.id, "c");
        assert_eq!(second.external_code, "d");
    }

    #[tokio::test]
    async fn test_exhausted_identifier_space_is_an_internal_error() {
        let ids = Arc::new(ScriptedIds::new(vec!["only"]));
        let registry = DeviceRegistry::with_id_generator(ids);

        let result = registry.create("One", "Type", DeviceStatus::Online).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_find_by_id_returns_created_record() {
        let registry = DeviceRegistry::new();
        let created = registry
            .create("Lab Analyzer Alpha", "Blood Analyzer", DeviceStatus::Online)
            .await
            .unwrap();

        let found = registry.find_by_id(&created.id).await;

        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn test_find_by_id_does_not_match_external_code() {
        let registry = DeviceRegistry::new();
        let created = registry
            .create("Analyzer", "Chemistry", DeviceStatus::Online)
            .await
            .unwrap();

        assert!(registry.find_by_id(&created.external_code).await.is_none());
    }

    #[tokio::test]
    async fn test_find_all_filters_by_status_in_insertion_order() {
        let registry = DeviceRegistry::new();
        let a = registry.create("A", "T", DeviceStatus::Online).await.unwrap();
        let b = registry.create("B", "T", DeviceStatus::Offline).await.unwrap();
        let c = registry.create("C", "T", DeviceStatus::Online).await.unwrap();

        let all = registry.find_all(None).await;
        assert_eq!(all, vec![a.clone(), b.clone(), c.clone()]);

        let online = registry.find_all(Some(DeviceStatus::Online)).await;
        assert_eq!(online, vec![a, c]);

        let offline = registry.find_all(Some(DeviceStatus::Offline)).await;
        assert_eq!(offline, vec![b]);
    }

    #[tokio::test]
    async fn test_update_status_unknown_id_leaves_registry_unchanged() {
        let registry = DeviceRegistry::new();
        registry.create("A", "T", DeviceStatus::Offline).await.unwrap();
        let before = registry.find_all(None).await;

        let result = registry
            .update_status("does-not-exist", DeviceStatus::Online)
            .await;

        assert!(result.is_none());
        assert_eq!(registry.find_all(None).await, before);
    }

    #[tokio::test]
    async fn test_update_status_overwrites_status_and_timestamp_only() {
        let registry = DeviceRegistry::new();
        let created = registry
            .create("Analyzer", "Hematology", DeviceStatus::Online)
            .await
            .unwrap();

        let updated = registry
            .update_status(&created.id, DeviceStatus::Offline)
            .await
            .unwrap();

        assert_eq!(updated.status, DeviceStatus::Offline);
        assert!(updated.last_updated > created.last_updated);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.external_code, created.external_code);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.device_type, created.device_type);

        let stored = registry.find_by_id(&created.id).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_repeated_updates_strictly_increase_timestamp() {
        let registry = DeviceRegistry::new();
        let created = registry
            .create("Analyzer", "Hematology", DeviceStatus::Online)
            .await
            .unwrap();

        let mut last = created.last_updated;
        for i in 0..20 {
            let status = if i % 2 == 0 {
                DeviceStatus::Offline
            } else {
                DeviceStatus::Online
            };
            let updated = registry.update_status(&created.id, status).await.unwrap();
            assert!(updated.last_updated > last);
            last = updated.last_updated;
        }
    }

    #[test]
    fn test_next_timestamp_moves_past_future_previous() {
        let future = Utc::now() + Duration::hours(1);
        let next = next_timestamp(Some(future));
        assert_eq!(next, future + Duration::milliseconds(1));
    }

    #[test]
    fn test_next_timestamp_uses_clock_when_ahead() {
        let past = Utc::now() - Duration::hours(1);
        let next = next_timestamp(Some(past));
        assert!(next > past + Duration::minutes(59));
    }
}
