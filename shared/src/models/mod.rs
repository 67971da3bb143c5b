//! Domain models for the Municipal Weather Monitoring service

mod notification;
mod report;
mod station;
mod user;
mod weather;

pub use notification::*;
pub use report::*;
pub use station::*;
pub use user::*;
pub use weather::*;
