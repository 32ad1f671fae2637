mod controller;
mod state;

pub use controller::{CaptureController, CaptureError, CaptureOutcome, RESULT_DISMISS_AFTER};
pub use state::{CaptureState, CaptureStatus};
