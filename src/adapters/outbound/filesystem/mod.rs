/// Filesystem adapters for scan artifacts
mod archive;
mod artifact_store;

pub use artifact_store::FileSystemArtifactStore;
