pub mod router;
pub mod types;
pub mod handlers {
    pub mod alerts;
    pub mod dashboard;
    pub mod health;
    pub mod monitors;
    pub mod root;
}

pub use router::{build_app, create_router, ApiDoc};
pub use types::AppState;
