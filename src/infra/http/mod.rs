mod admin;
mod error;
mod identity;
mod public;
mod state;

pub use admin::build_admin_router;
pub use error::{ApiError, ApiErrorBody};
pub use identity::client_identity;
pub use public::{PostView, ProjectView, build_public_router};
pub use state::{AdminState, PublicState};
