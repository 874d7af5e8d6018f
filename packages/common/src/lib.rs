pub mod artifact;
pub mod config;
pub mod task_status;

pub use task_status::TaskStatus;
