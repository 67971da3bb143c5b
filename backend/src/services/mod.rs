//! Business logic services for the Municipal Weather Monitoring service

pub mod auth;
pub mod notifications;
pub mod reports;
pub mod stations;
pub mod users;
pub mod weather;

pub use auth::AuthService;
pub use notifications::NotificationService;
pub use reports::ReportService;
pub use stations::StationService;
pub use users::UserService;
pub use weather::WeatherService;
