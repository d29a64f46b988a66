//! Data models for the canopy backend.
//!
//! Wire format is camelCase JSON; entities reference each other by id and
//! are resolved into `UserRef`-style embeds where listings need them.

mod badge;
mod event;
mod gallery;
mod notification;
mod pagination;
mod tree;
mod user;

pub use badge::*;
pub use event::*;
pub use gallery::*;
pub use notification::*;
pub use pagination::*;
pub use tree::*;
pub use user::*;
