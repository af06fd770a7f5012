pub mod storage;
pub mod tool;
