use std::fmt::Debug;

use super::prepare::{AuthRequest, Prepared};
use crate::models::content::Owned;

/// Decides an `own` permission for the current request.
///
/// Checks run after Prepare and only look at what it attached to the
/// request; they never fetch or mutate anything.
pub trait OwnershipCheck: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn is_owner(&self, request: &AuthRequest) -> bool;
}

fn owns<R: Owned>(request: &AuthRequest, resource: Option<&R>) -> bool {
    if request.target.is_new() {
        return true;
    }

    // the guest identity stands in for "no user"
    if request.user.is_anonymous() {
        return false;
    }

    match resource {
        Some(resource) => resource.owner_id() == request.user.id,
        None => false,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostOwnerCheck;

impl OwnershipCheck for PostOwnerCheck {
    fn name(&self) -> &'static str {
        "post_owner"
    }

    fn is_owner(&self, request: &AuthRequest) -> bool {
        owns(request, request.resource.as_ref().and_then(Prepared::as_post))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileOwnerCheck;

impl OwnershipCheck for FileOwnerCheck {
    fn name(&self) -> &'static str {
        "file_owner"
    }

    fn is_owner(&self, request: &AuthRequest) -> bool {
        owns(request, request.resource.as_ref().and_then(Prepared::as_file))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommentOwnerCheck;

impl OwnershipCheck for CommentOwnerCheck {
    fn name(&self) -> &'static str {
        "comment_owner"
    }

    fn is_owner(&self, request: &AuthRequest) -> bool {
        owns(request, request.resource.as_ref().and_then(Prepared::as_comment))
    }
}

/// `own` on actions without a resource: any signed-in user qualifies.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowLoggedInUser;

impl OwnershipCheck for AllowLoggedInUser {
    fn name(&self) -> &'static str {
        "logged_in"
    }

    fn is_owner(&self, request: &AuthRequest) -> bool {
        !request.user.is_anonymous()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl OwnershipCheck for AllowAll {
    fn name(&self) -> &'static str {
        "allow_all"
    }

    fn is_owner(&self, _request: &AuthRequest) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowNone;

impl OwnershipCheck for AllowNone {
    fn name(&self) -> &'static str {
        "allow_none"
    }

    fn is_owner(&self, _request: &AuthRequest) -> bool {
        false
    }
}
