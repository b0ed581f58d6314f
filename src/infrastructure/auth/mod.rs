pub mod request_id;
pub mod session;

pub use request_id::{request_id_middleware, RequestId};
pub use session::{session_middleware, CurrentSession, SESSION_COOKIE};
