pub mod artifact_fetch;
pub mod email;
pub mod object_store;
pub mod status_table;
