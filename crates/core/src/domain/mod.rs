pub mod summary;
pub mod thread;
