pub mod devices;
pub mod test_results;

pub use devices::DeviceService;
pub use test_results::{AssayDefinition, ResultSynthesizer, ASSAYS};
