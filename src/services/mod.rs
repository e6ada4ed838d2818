//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own game orchestration and persistence concerns so route
//! handlers can stay focused on protocol translation. `lobby` manages
//! participants and waiting rooms, `room` runs one actor per started game,
//! `dictionaries` owns the word-list files, and `persistence` the
//! leaderboards, match history, and AI name pools.

pub mod dictionaries;
pub mod lobby;
pub mod persistence;
pub mod room;
