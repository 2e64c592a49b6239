pub mod auth;
pub mod team;
pub mod tickets;

pub use auth::{AuthService, SessionContext};
pub use team::TeamService;
pub use tickets::TicketService;
