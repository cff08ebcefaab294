//! Capability checks for mutating handlers.
use crate::api::error::{ApiError, api_forbidden, api_internal};
use crate::app::AppState;
use crate::auth::identity::Caller;
use marketplace_authz::Capability;

/// Fail with 403 unless `caller` holds `capability` in the configured guard.
///
/// Anonymous callers are denied here rather than at authentication, so an
/// unauthenticated write and an under-privileged write look the same.
pub async fn require_capability(
    state: &AppState,
    caller: &Caller,
    capability: Capability,
) -> Result<(), ApiError> {
    let decision = state
        .store
        .authorize(caller.user_id(), capability, &state.guard)
        .await
        .map_err(|err| api_internal("failed to evaluate permissions", &err))?;
    decision.require(capability).map_err(|err| {
        metrics::counter!(
            "marketplace_authorization_denied_total",
            "capability" => capability.as_str()
        )
        .increment(1);
        tracing::info!(
            capability = capability.as_str(),
            user_id = ?caller.user_id(),
            key = %caller.identity.resolve(),
            "authorization denied"
        );
        api_forbidden(&err.to_string())
    })
}
