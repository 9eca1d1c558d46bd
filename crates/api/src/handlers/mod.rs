pub mod metrics;
pub mod notification;
pub mod template;
