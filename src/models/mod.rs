pub mod device;
pub mod test_result;

pub use device::{
    Device, DeviceQueryParams, DeviceStatus, RegisterDeviceRequest, UpdateDeviceStatusRequest,
};
pub use test_result::{TestResult, TestResultStatus};
