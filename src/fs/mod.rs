pub mod clipboard;
pub mod entry;
pub mod gateway;
