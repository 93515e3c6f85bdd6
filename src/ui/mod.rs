pub mod clipboard;
pub mod controller;
pub mod page;
pub mod server;
