pub mod monitoring_service;

pub use monitoring_service::MonitoringService;
