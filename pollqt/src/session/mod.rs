//! One poll cycle: authentication, rate-gated requests and snapshot assembly.
//!
//! Every function here takes the cycle's cancellation scope. In-flight requests are
//! allowed to finish, but once the scope is cancelled no further request is issued and
//! no result is committed to the credential or the poller state.

mod auth;
mod cycle;
mod request;

pub(crate) use cycle::poll_cycle;
