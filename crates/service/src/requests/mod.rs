//! Media requests: repository seam, file-backed store and the service that
//! authorizes every read and mutation.

pub mod repository;
pub mod service;
pub mod store;

pub use repository::RequestRepository;
pub use service::RequestService;
pub use store::RequestStore;
