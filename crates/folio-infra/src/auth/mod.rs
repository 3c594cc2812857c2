//! Authentication implementations: session tokens, OAuth state and providers.

mod oauth;
pub mod pkce;
mod state;
mod token;

pub use oauth::{OAuthClient, OAuthCredentials, OAuthEndpoints, ProviderKind};
pub use state::{IssuedState, OAuthStateCodec};
pub use token::RandomTokenGenerator;
