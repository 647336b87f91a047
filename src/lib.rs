//! Spot-the-differences session server
//!
//! Matches players into game sessions, referees each session (countdown,
//! hit validation, scoring, win detection) and tears sessions down when they
//! finish or empty out.

pub mod app;
pub mod collab;
pub mod config;
pub mod error;
pub mod game;
pub mod http;
pub mod matchmaking;
pub mod session;
pub mod util;
pub mod ws;
