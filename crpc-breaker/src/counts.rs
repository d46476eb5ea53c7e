/// Request/outcome tally for one breaker generation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub requests: u64,
    pub total_success: u64,
    pub total_failures: u64,
    pub consecutive_success: u64,
    pub consecutive_failures: u64,
}

impl Counts {
    pub fn on_request(&mut self) {
        self.requests += 1;
    }

    pub fn on_success(&mut self) {
        self.total_success += 1;
        self.consecutive_success += 1;
        self.consecutive_failures = 0;
    }

    pub fn on_failure(&mut self) {
        self.total_failures += 1;
        self.consecutive_failures += 1;
        self.consecutive_success = 0;
    }

    pub fn clear(&mut self) {
        *self = Counts::default();
    }
}
