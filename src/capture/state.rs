use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureStatus {
    #[default]
    Idle,
    /// A photo is on its way through encode, upload, parse and store. New
    /// captures are refused until it settles.
    Processing,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureState {
    pub status: CaptureStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub last_capture_id: Option<i64>,
}

impl CaptureState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.status == CaptureStatus::Processing
    }

    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.status = CaptureStatus::Processing;
        self.started_at = Some(now);
    }

    pub fn finish(&mut self, stored_id: Option<i64>) {
        self.status = CaptureStatus::Idle;
        self.started_at = None;
        if stored_id.is_some() {
            self.last_capture_id = stored_id;
        }
    }
}
