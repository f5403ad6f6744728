//! Service layer for media requests.
//! - `storage` holds the generic JSON snapshot store with asynchronous write-back.
//! - `requests` adds the request repository and the authorization/lifecycle rules.
//! - Callers arrive as plain `Caller` values resolved by the host boundary.

pub mod errors;
pub mod caller;
pub mod storage;
pub mod requests;
