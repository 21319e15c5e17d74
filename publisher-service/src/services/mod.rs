pub mod instagram;
pub mod posts;
pub mod publisher;
pub mod tasks;
