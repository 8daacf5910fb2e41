/// Request to scan one uploaded archive
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Principal the scan belongs to
    pub owner: String,
    /// User-supplied archive filename, kept for display
    pub filename: String,
    /// Whether the rendered report includes the PCI DSS compliance notice
    pub compliance: bool,
    /// Raw archive bytes
    pub archive: Vec<u8>,
}

impl ScanRequest {
    pub fn new(
        owner: impl Into<String>,
        filename: impl Into<String>,
        compliance: bool,
        archive: Vec<u8>,
    ) -> Self {
        Self {
            owner: owner.into(),
            filename: filename.into(),
            compliance,
            archive,
        }
    }
}
