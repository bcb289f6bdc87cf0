pub mod app;
pub mod checks;
pub mod domain;
pub mod error;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::MonitoringService;
pub use infra::config::AppConfig;
pub use infra::mailer::{AlertNotifier, DisabledNotifier, SmtpMailer};
pub use storage::{MemoryStore, MongoStore, MonitorStore};
pub use transport::http::{build_app, AppState};
