// Four-button differential drive runtime for a two-motor mobility base

pub mod config;
pub mod drive;
pub mod input;
pub mod messages;
pub mod motor;
pub mod runtime;
