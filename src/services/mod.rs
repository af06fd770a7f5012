pub mod intake;
pub mod metadata_tool;
pub mod origin;
pub mod report;
pub mod session_store;
pub mod worker;
