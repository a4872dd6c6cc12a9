pub mod record;
pub mod store;

pub use record::{SessionHandoff, SessionRecord};
pub use store::{ActiveSession, SessionAccess, SessionSource, SessionStore};
