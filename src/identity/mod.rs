//! Session state and provider identity handling for member accounts.
//! Keep the public surface thin and split implementation across sub-modules.

mod authorisation;
mod provider;
mod session;
mod token;

pub use authorisation::{Authorisation, Expiry};
pub use provider::ProviderClient;
pub use session::{Session, TransitionalProvider};
pub use token::AccessToken;
