pub mod auth;
pub mod comments;
pub mod files;
pub mod health;
pub mod manage;
pub mod posts;
pub mod users;

use axum::http::Method;
use axum::routing::get;

use crate::app::RouteTable;
use crate::authz::actions;
use crate::authz::{
    AllowLoggedInUser, AllowNone, AuthConfig, CommentOwnerCheck, CommentPreparer, FileOwnerCheck, FilePreparer,
    PostOwnerCheck, PostPreparer,
};
use crate::errors::AppResult;
use crate::models::role::PermissionValue::{All, None as Deny, Own};

/// Every application route, with the action guarding it.
pub fn table() -> AppResult<RouteTable> {
    let table = RouteTable::new()
        .public("/health", get(health::health))
        .public("/login", get(auth::login_page).post(auth::login))
        .public("/logout", get(auth::logout))
        .public("/inactive", get(auth::inactive));

    let table = table
        .guarded(
            Method::GET,
            "/posts",
            posts::list_posts,
            AuthConfig::new(actions::POST_LIST, Own).with_own_check(AllowLoggedInUser),
        )?
        .guarded(
            Method::GET,
            "/posts/:id",
            posts::view_post,
            AuthConfig::new(actions::POST_VIEW, All)
                .with_prepare(PostPreparer)
                .with_own_check(PostOwnerCheck),
        )?
        .guarded(
            Method::GET,
            "/posts/:id/edit",
            posts::compose_post,
            AuthConfig::new(actions::POST_COMPOSE, Own)
                .with_prepare(PostPreparer)
                .with_own_check(PostOwnerCheck),
        )?
        .guarded(
            Method::POST,
            "/posts/:id",
            posts::save_post,
            AuthConfig::new(actions::POST_SAVE, Own)
                .with_prepare(PostPreparer)
                .with_own_check(PostOwnerCheck),
        )?
        .guarded(
            Method::DELETE,
            "/posts/:id",
            posts::delete_post,
            AuthConfig::new(actions::POST_DELETE, Own)
                .with_prepare(PostPreparer)
                .with_own_check(PostOwnerCheck),
        )?;

    let table = table
        .guarded(
            Method::GET,
            "/comments",
            comments::list_comments,
            AuthConfig::new(actions::COMMENT_LIST, Own).with_own_check(AllowLoggedInUser),
        )?
        .guarded(
            Method::POST,
            "/comments/:id",
            comments::save_comment,
            AuthConfig::new(actions::COMMENT_SAVE, Own)
                .with_prepare(CommentPreparer)
                .with_own_check(CommentOwnerCheck),
        )?
        .guarded(
            Method::DELETE,
            "/comments/:id",
            comments::delete_comment,
            AuthConfig::new(actions::COMMENT_DELETE, Own)
                .with_prepare(CommentPreparer)
                .with_own_check(CommentOwnerCheck),
        )?;

    let table = table
        .guarded(
            Method::GET,
            "/files",
            files::list_files,
            AuthConfig::new(actions::FILE_LIST, Own).with_own_check(AllowLoggedInUser),
        )?
        .guarded(
            Method::POST,
            "/files/upload",
            files::upload_file,
            AuthConfig::new(actions::FILE_UPLOAD, Own).with_own_check(AllowLoggedInUser),
        )?
        .guarded(
            Method::DELETE,
            "/files/:id",
            files::delete_file,
            AuthConfig::new(actions::FILE_DELETE, Own)
                .with_prepare(FilePreparer)
                .with_own_check(FileOwnerCheck),
        )?;

    let table = table.guarded(
        Method::GET,
        "/u/:username",
        users::profile,
        AuthConfig::new(actions::USER_PROFILE, All),
    )?;

    // administration is root-only unless a role is explicitly granted `all`
    table
        .guarded(
            Method::GET,
            "/manage",
            manage::dashboard,
            AuthConfig::new(actions::MANAGE, Deny).with_own_check(AllowNone),
        )?
        .guarded(
            Method::GET,
            "/manage/roles",
            manage::list_roles,
            AuthConfig::new(actions::MANAGE_ROLE_LIST, Deny).with_own_check(AllowNone),
        )?
        .guarded(
            Method::GET,
            "/manage/roles/:id",
            manage::compose_role,
            AuthConfig::new(actions::MANAGE_ROLE_COMPOSE, Deny).with_own_check(AllowNone),
        )?
        .guarded(
            Method::POST,
            "/manage/roles/:id",
            manage::save_role,
            AuthConfig::new(actions::MANAGE_ROLE_SAVE, Deny).with_own_check(AllowNone),
        )?
        .guarded(
            Method::DELETE,
            "/manage/roles/:id",
            manage::delete_role,
            AuthConfig::new(actions::MANAGE_ROLE_DELETE, Deny).with_own_check(AllowNone),
        )
}
