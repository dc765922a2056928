//! Terminal front end for the reel engine

pub mod presenter;

pub use presenter::*;
