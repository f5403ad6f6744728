pub mod errors;
pub mod media_request;

pub use media_request::{CreateRequestInput, MediaRequest, RequestEdit, RequestStatus};
