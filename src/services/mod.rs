pub mod jobs;
pub mod notification;
