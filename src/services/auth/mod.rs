pub mod cookies;
pub mod factory;
pub mod jwt;
pub mod provider;
pub mod session_issuer;
pub mod token;

pub use factory::{build_identity_provider, build_session_issuer};
pub use session_issuer::{SessionIssuer, SessionVerifier};
pub use token::SessionToken;
