// handlers/protected - endpoints behind jwt_auth_middleware
//
// Every handler here can rely on an `AuthUser` extension; the user's
// subject keys both the itinerary store and the websocket registry.
pub mod me;
pub mod spots;

pub use me::me_get;
pub use spots::{spots_get, spots_put, spots_reorder, spots_reset, spots_selected, spots_toggle};
