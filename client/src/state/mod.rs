//! Client-side view state: the reducer and the identity-keyed roster.

pub mod roster;
pub mod view;

pub use roster::{Roster, UserView};
pub use view::{Action, Brush, ClientView};
