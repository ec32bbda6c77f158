pub mod health;
pub mod submit;
pub mod approve;
pub mod list;
pub mod order;
pub mod upload;

pub use health::health_handler;
pub use submit::submit_handler;
pub use approve::approve_handler;
pub use list::{approved_handler, approved_pickup_handler, pending_handler};
pub use order::order_handler;
pub use upload::upload_handler;

#[cfg(test)]
pub(crate) mod test_support;
