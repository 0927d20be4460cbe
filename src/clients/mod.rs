//! Clients for the remote collaborators
//!
//! Each service sits behind a trait so the planner and the HTTP layer get
//! an explicitly constructed client injected, and tests can substitute fakes.

pub mod city_search;
pub mod http;
pub mod identity;
pub mod route_probe;
pub mod transport_factors;

pub use city_search::{CityQuery, CitySearch, PhotonCitySearch};
pub use identity::{AuthSession, AuthUser, FederatedCredential, FirebaseIdentityClient, IdentityService};
pub use route_probe::{OpenRouteServiceClient, RouteProbe, RouteSummary, RoutingProfile};
pub use transport_factors::{ImpactCo2Client, TransportFactorService};
