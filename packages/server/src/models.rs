pub mod config;
pub mod event;
pub mod game;
pub mod player;
pub mod role;
pub mod rule;
