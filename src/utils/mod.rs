pub mod req_manager;
pub mod retry;

pub use req_manager::ReqManager;
pub use retry::{RetryError, RetryPolicy};
