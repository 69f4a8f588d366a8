//! hotelpress application library
//!
//! The publishing module and the helpers it shares with the CLI.

pub mod modules;
pub mod utils;
