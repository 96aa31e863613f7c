pub mod conversations;
pub mod messages;

use plaza_auth::AuthContext;

use crate::domain::entities::ParticipantProfile;

/// The caller as the identity gateway asserted them
pub(crate) fn caller_profile(ctx: &AuthContext) -> ParticipantProfile {
    ParticipantProfile::new(
        ctx.user.id.clone(),
        ctx.user.display_name.clone(),
        ctx.user.avatar_ref.clone(),
    )
}
