//! # portal
//!
//! Client-side core of the movie API developer portal: the session/auth
//! controller with its route guard, the dashboard and admin view state, and
//! the network layer they talk through.
//!
//! The crate has no UI of its own. `movie-cli` drives it from a terminal;
//! any other front end can own a [`state::session::SessionController`] the
//! same way.

pub mod net;
pub mod state;
