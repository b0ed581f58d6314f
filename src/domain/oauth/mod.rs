pub mod error;
pub mod identity;
pub mod session;
pub mod token;

pub use error::OAuthError;
pub use identity::Identity;
pub use session::{ConnectionStatus, OAuthSession};
pub use token::{TokenGrant, TokenRecord};
