pub mod coercion;
pub mod normalizer;
pub mod spreadsheet;
pub mod filter;
pub mod aggregation;
pub mod classification_service;
pub use classification_service::ClassificationService;
pub mod import_service;
pub use import_service::ImportService;
pub mod dashboard_service;
pub use dashboard_service::DashboardService;
pub mod robot_service;
pub use robot_service::RobotService;
