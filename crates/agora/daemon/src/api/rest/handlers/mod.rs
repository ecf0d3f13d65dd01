//! API request handlers

mod agents;
mod bills;
mod comments;
mod gazette;
mod health;
mod maintenance;
mod parties;

pub use agents::*;
pub use bills::*;
pub use comments::*;
pub use gazette::*;
pub use health::*;
pub use maintenance::*;
pub use parties::*;
