/// Domain layer - scan lifecycle, findings and report interpretation
pub mod domain;
pub mod services;
