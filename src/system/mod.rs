pub mod collector;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod platform;
pub mod power;
pub mod process;
pub mod reader;
pub mod snapshot;
pub mod table;
pub mod uptime;
