//! Application services.

pub mod auth;
pub mod contacts;
pub mod geocode;
pub mod poem;

pub use auth::{AuthService, AuthStatus, NewUserProfile};
pub use contacts::{ContactFields, ContactService};
pub use geocode::{Geocoder, NominatimClient};
pub use poem::PoemClient;
