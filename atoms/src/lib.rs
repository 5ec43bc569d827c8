pub mod attachments;
pub mod employees;
pub mod error;
pub mod export;
pub mod filter;
pub mod http;
pub mod session;
pub mod tasks;

pub use error::StoreError;
