use depscan::prelude::*;

/// Mock ProgressReporter for testing that captures messages
#[derive(Default, Clone)]
pub struct MockProgressReporter {
    pub messages: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

impl MockProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn messages_for(&self, scan_id: &ScanId) -> Vec<String> {
        let prefix = format!("{} ", scan_id);
        self.get_messages()
            .into_iter()
            .filter_map(|m| m.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }
}

impl ProgressReporter for MockProgressReporter {
    fn report_stage(&self, scan_id: &ScanId, status: ScanStatus) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("{} Stage: {}", scan_id, status));
    }

    fn report_error(&self, scan_id: &ScanId, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("{} Error: {}", scan_id, message));
    }

    fn report_completion(&self, scan_id: &ScanId, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("{} Completed: {}", scan_id, message));
    }
}
