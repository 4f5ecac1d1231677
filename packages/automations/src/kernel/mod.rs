// Kernel - infrastructure shared by every engine component

mod engine_kernel;
pub mod service_host;
pub mod test_dependencies;
pub mod traits;

pub use engine_kernel::EngineKernel;
pub use service_host::{Service, ServiceHost};
pub use test_dependencies::TestDependencies;
pub use traits::*;
