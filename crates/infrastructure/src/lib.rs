//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_tracking_api;
mod in_memory_notification_store;
mod json_file_notification_store;
mod redis_notification_store;

pub use http_tracking_api::HttpTrackingApi;
pub use in_memory_notification_store::InMemoryNotificationStore;
pub use json_file_notification_store::JsonFileNotificationStore;
pub use redis_notification_store::RedisNotificationStore;
