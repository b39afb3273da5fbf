mod accounts;
mod companies;
pub mod dto;
mod invitations;
mod posts;
mod profile;
pub mod response;
mod router;
pub mod validation;

pub use router::{AppState, create_router};
