pub mod icons;
pub mod progress;
pub mod summary;

pub use progress::DeployUI;
