pub mod cookies;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod middleware;
pub mod views;
