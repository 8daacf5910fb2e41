/// Mock implementations for testing
mod mock_progress_reporter;
mod mock_report_writer;
mod mock_scanner;

pub use mock_progress_reporter::MockProgressReporter;
pub use mock_report_writer::MockReportWriter;
pub use mock_scanner::{MockScanner, ScannerBehavior};
