use rand::Rng;

use crate::config::ResultsConfig;
use crate::error::{AppError, Result};
use crate::models::{Device, DeviceStatus, RegisterDeviceRequest, TestResult};
use crate::repositories::DeviceRegistry;
use crate::services::ResultSynthesizer;

#[derive(Clone)]
pub struct DeviceService {
    registry: DeviceRegistry,
    synthesizer: ResultSynthesizer,
    results: ResultsConfig,
}

impl DeviceService {
    pub fn new(
        registry: DeviceRegistry,
        synthesizer: ResultSynthesizer,
        results: ResultsConfig,
    ) -> Self {
        Self {
            registry,
            synthesizer,
            results,
        }
    }

    pub async fn create_device(&self, request: RegisterDeviceRequest) -> Result<Device> {
        if request.device_name.is_empty() {
            return Err(AppError::InvalidInput("Device name is required".to_string()));
        }
        if request.device_type.is_empty() {
            return Err(AppError::InvalidInput("Device type is required".to_string()));
        }
        let status: DeviceStatus = request.status.parse()?;

        self.registry
            .create(&request.device_name, &request.device_type, status)
            .await
    }

    /// An empty filter string means "no filter".
    pub async fn list_devices(&self, status: Option<&str>) -> Result<Vec<Device>> {
        let filter = match status {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<DeviceStatus>()?),
            _ => None,
        };

        Ok(self.registry.find_all(filter).await)
    }

    pub async fn get_device(&self, id: &str) -> Result<Device> {
        self.registry
            .find_by_id(id)
            .await
            .ok_or_else(|| device_not_found(id))
    }

    pub async fn set_device_status(&self, id: &str, status: &str) -> Result<Device> {
        let status: DeviceStatus = status.parse()?;

        self.registry
            .update_status(id, status)
            .await
            .ok_or_else(|| device_not_found(id))
    }

    pub async fn get_device_results(&self, id: &str, count: usize) -> Result<Vec<TestResult>> {
        if self.registry.find_by_id(id).await.is_none() {
            return Err(device_not_found(id));
        }

        self.synthesizer.generate(count)
    }

    /// Results for a device with the batch size drawn from the configured range.
    pub async fn get_device_results_random(&self, id: &str) -> Result<Vec<TestResult>> {
        let count =
            rand::thread_rng().gen_range(self.results.min_count..=self.results.max_count);

        self.get_device_results(id, count).await
    }

    pub async fn device_count(&self) -> usize {
        self.registry.count().await
    }
}

fn device_not_found(id: &str) -> AppError {
    tracing::debug!(device_id = %id, "Device not found");
    AppError::NotFound(format!("Device {} not found", id))
}
