pub mod captured_response;

pub use captured_response::CapturedResponse;
