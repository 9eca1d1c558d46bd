//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&DbPool` as the first argument. Rows are decoded into the
//! domain types from `courier_core`.

pub mod notification_repo;
pub mod template_repo;

pub use notification_repo::NotificationRepo;
pub use template_repo::TemplateRepo;
