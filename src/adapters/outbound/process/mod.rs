/// Process adapters for the external vulnerability scanner
mod dependency_check;

pub use dependency_check::DependencyCheckScanner;
