pub mod devices;

pub use devices::{DeviceRegistry, IdGenerator, UuidGenerator};
