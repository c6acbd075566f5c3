pub mod sns;
pub mod submission;
