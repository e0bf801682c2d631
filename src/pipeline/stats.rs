//! Live statistics owned by the coordinator. A single mutex guards the
//! whole counter set so `stats()` always returns a self-consistent
//! snapshot — never a torn read across fields.

use std::sync::Mutex;

/// Read-only snapshot of the coordinator's live counters.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Snapshot {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub stopped: usize,
    pub stage1_active: usize,
    pub stage2_active: usize,
    pub in_buffer: usize,
    pub current_doc_id: Option<String>,
    pub is_running: bool,
    pub ocr_workers: usize,
    pub llm_workers: usize,
}

#[derive(Debug, Default)]
struct Counters {
    total: usize,
    processed: usize,
    successful: usize,
    failed: usize,
    stopped: usize,
    stage1_active: usize,
    stage2_active: usize,
    in_buffer: usize,
    current_doc_id: Option<String>,
    is_running: bool,
    ocr_workers: usize,
    llm_workers: usize,
}

pub struct Stats {
    inner: Mutex<Counters>,
}

impl Stats {
    pub fn new(total: usize, ocr_workers: usize, llm_workers: usize) -> Self {
        Self {
            inner: Mutex::new(Counters {
                total,
                is_running: true,
                ocr_workers,
                llm_workers,
                ..Default::default()
            }),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let c = self.inner.lock().expect("stats mutex poisoned");
        Snapshot {
            total: c.total,
            processed: c.processed,
            successful: c.successful,
            failed: c.failed,
            stopped: c.stopped,
            stage1_active: c.stage1_active,
            stage2_active: c.stage2_active,
            in_buffer: c.in_buffer,
            current_doc_id: c.current_doc_id.clone(),
            is_running: c.is_running,
            ocr_workers: c.ocr_workers,
            llm_workers: c.llm_workers,
        }
    }

    pub fn enter_stage1(&self, doc_id: &str) {
        let mut c = self.inner.lock().expect("stats mutex poisoned");
        c.stage1_active += 1;
        c.current_doc_id = Some(doc_id.to_string());
    }

    pub fn exit_stage1(&self) {
        let mut c = self.inner.lock().expect("stats mutex poisoned");
        c.stage1_active = c.stage1_active.saturating_sub(1);
    }

    pub fn enter_stage2(&self) {
        let mut c = self.inner.lock().expect("stats mutex poisoned");
        c.stage2_active += 1;
    }

    pub fn exit_stage2(&self) {
        let mut c = self.inner.lock().expect("stats mutex poisoned");
        c.stage2_active = c.stage2_active.saturating_sub(1);
    }

    pub fn set_in_buffer(&self, n: usize) {
        let mut c = self.inner.lock().expect("stats mutex poisoned");
        c.in_buffer = n;
    }

    pub fn record_successful(&self) {
        let mut c = self.inner.lock().expect("stats mutex poisoned");
        c.processed += 1;
        c.successful += 1;
    }

    pub fn record_failed(&self) {
        let mut c = self.inner.lock().expect("stats mutex poisoned");
        c.processed += 1;
        c.failed += 1;
    }

    pub fn record_stopped(&self) {
        let mut c = self.inner.lock().expect("stats mutex poisoned");
        c.processed += 1;
        c.stopped += 1;
    }

    pub fn set_running(&self, running: bool) {
        let mut c = self.inner.lock().expect("stats mutex poisoned");
        c.is_running = running;
    }

    pub fn set_total(&self, total: usize) {
        let mut c = self.inner.lock().expect("stats mutex poisoned");
        c.total = total;
        c.processed = 0;
        c.successful = 0;
        c.failed = 0;
        c.stopped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_equals_sum_of_outcomes() {
        let stats = Stats::new(3, 2, 8);
        stats.record_successful();
        stats.record_failed();
        stats.record_stopped();
        let snap = stats.snapshot();
        assert_eq!(snap.processed, snap.successful + snap.failed + snap.stopped);
        assert_eq!(snap.processed, 3);
    }

    #[test]
    fn stage1_active_never_underflows() {
        let stats = Stats::new(1, 1, 1);
        stats.exit_stage1();
        assert_eq!(stats.snapshot().stage1_active, 0);
    }
}
