pub mod device;
pub mod error;
pub mod port;
pub mod retry;
pub mod select;
pub mod simulated;
pub mod station;

pub use device::DeviceSensor;
pub use error::SensorError;
pub use port::SensorPort;
pub use retry::{RetryPolicy, RetryingSensor};
pub use select::build_sensor;
pub use simulated::SimulatedSensor;
pub use station::StationSensor;
