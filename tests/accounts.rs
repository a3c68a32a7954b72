mod common;

use chrono::Duration;
use storefront_api::{
    dto::{
        admin::UpdateRoleRequest,
        favorites::AddFavoriteRequest,
        profile::{RegisterProfileRequest, UpdateProfileRequest},
        support::SubmitTicketRequest,
    },
    error::AppError,
    middleware::auth::{AuthConfig, TokenSubject, authorize},
    routes::params::{Pagination, ProductQuery, TicketQuery},
    services::{admin_service, catalog_service, favorite_service, profile_service, support_service},
    session::SessionEvent,
    status::{Role, TicketStatus},
    store::ProfileStore,
};
use uuid::Uuid;

use common::{JWT_SECRET, fixture};

#[tokio::test]
async fn toggle_flips_the_stored_state() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;

    let first = favorite_service::toggle_favorite(&fx.state, &user, belt.id)
        .await?
        .data
        .expect("state");
    assert!(first.is_favorite);

    let second = favorite_service::toggle_favorite(&fx.state, &user, belt.id)
        .await?
        .data
        .expect("state");
    assert!(!second.is_favorite);

    let listed = favorite_service::list_favorites(&fx.state, &user, Pagination::default())
        .await?
        .data
        .expect("favorites");
    assert!(listed.items.is_empty());

    let err = favorite_service::toggle_favorite(&fx.state, &user, Uuid::new_v4())
        .await
        .expect_err("unknown product");
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn adding_a_favorite_twice_keeps_one() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;

    for _ in 0..2 {
        favorite_service::add_favorite(
            &fx.state,
            &user,
            AddFavoriteRequest {
                product_id: belt.id,
            },
        )
        .await?;
    }
    let listed = favorite_service::list_favorites(&fx.state, &user, Pagination::default())
        .await?
        .data
        .expect("favorites");
    assert_eq!(listed.items.len(), 1);

    favorite_service::remove_favorite(&fx.state, &user, belt.id).await?;
    favorite_service::remove_favorite(&fx.state, &user, belt.id).await?;
    Ok(())
}

#[tokio::test]
async fn catalog_marks_favorites_and_cart_lines() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Leather Belt", 15_000, 10).await?;
    let wallet = fx.product("Leather Wallet", 25_000, 3).await?;
    fx.product("Straw Hat", 7_500, 20).await?;

    favorite_service::add_favorite(
        &fx.state,
        &user,
        AddFavoriteRequest {
            product_id: belt.id,
        },
    )
    .await?;
    fx.add(&user, &wallet, 1).await?;

    let listed = catalog_service::list_products(
        &fx.state,
        &user,
        ProductQuery {
            q: Some("leather".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("products");

    assert_eq!(listed.items.len(), 2);
    for entry in &listed.items {
        let is_belt = entry.product.id == belt.id;
        assert_eq!(entry.is_favorite, is_belt);
        assert_eq!(entry.in_cart, !is_belt);
    }
    Ok(())
}

#[tokio::test]
async fn role_changes_are_broadcast() -> anyhow::Result<()> {
    let fx = fixture();
    let admin = fx.admin("admin@example.com").await?;
    let user = fx.client("awa@example.com").await?;
    let mut events = fx.sessions.subscribe();

    let profile = admin_service::set_role(
        &fx.state,
        &admin,
        user.user_id,
        UpdateRoleRequest { role: Role::Banned },
    )
    .await?
    .data
    .expect("profile");
    assert_eq!(profile.role, Role::Banned);

    assert_eq!(
        events.recv().await?,
        SessionEvent::RoleChanged {
            user_id: user.user_id,
            role: Role::Banned,
        }
    );

    let err = authorize(&fx.state, user.user_id)
        .await
        .expect_err("banned user");
    assert!(matches!(err, AppError::Forbidden));

    admin_service::delete_user(&fx.state, &admin, user.user_id).await?;
    assert_eq!(
        events.recv().await?,
        SessionEvent::Removed {
            user_id: user.user_id
        }
    );
    let err = authorize(&fx.state, user.user_id)
        .await
        .expect_err("removed user");
    assert!(matches!(err, AppError::Unauthorized));
    Ok(())
}

#[tokio::test]
async fn admins_cannot_change_or_remove_themselves() -> anyhow::Result<()> {
    let fx = fixture();
    let admin = fx.admin("admin@example.com").await?;

    let err = admin_service::set_role(
        &fx.state,
        &admin,
        admin.user_id,
        UpdateRoleRequest { role: Role::Client },
    )
    .await
    .expect_err("self demotion");
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = admin_service::delete_user(&fx.state, &admin, admin.user_id)
        .await
        .expect_err("self removal");
    assert!(matches!(err, AppError::BadRequest(_)));

    let users = admin_service::list_users(&fx.state, &admin, Pagination::default())
        .await?
        .data
        .expect("users");
    assert_eq!(users.items.len(), 1);
    assert_eq!(users.items[0].role, Role::Admin);
    Ok(())
}

#[tokio::test]
async fn issued_tokens_resolve_to_profiles() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;

    let token = fx.state.auth.issue(user.user_id, Duration::minutes(5))?;
    let user_id = fx.state.auth.verify(&token)?;
    let resolved = authorize(&fx.state, user_id).await?;
    assert_eq!(resolved.user_id, user.user_id);
    assert_eq!(resolved.role, Role::Client);

    let foreign = AuthConfig::new("another-secret", None).issue(user.user_id, Duration::minutes(5))?;
    assert!(matches!(
        fx.state.auth.verify(&foreign),
        Err(AppError::Unauthorized)
    ));

    let unknown = AuthConfig::new(JWT_SECRET, None).issue(Uuid::new_v4(), Duration::minutes(5))?;
    let unknown_id = fx.state.auth.verify(&unknown)?;
    assert!(matches!(
        authorize(&fx.state, unknown_id).await,
        Err(AppError::Unauthorized)
    ));
    Ok(())
}

#[tokio::test]
async fn support_tickets_lifecycle() -> anyhow::Result<()> {
    let fx = fixture();
    let admin = fx.admin("admin@example.com").await?;
    let user = fx.client("awa@example.com").await?;

    let err = support_service::submit_ticket(
        &fx.state,
        &user,
        SubmitTicketRequest {
            subject: "   ".into(),
            message: "Where is my order?".into(),
        },
    )
    .await
    .expect_err("blank subject");
    assert!(matches!(err, AppError::BadRequest(_)));

    let ticket = support_service::submit_ticket(
        &fx.state,
        &user,
        SubmitTicketRequest {
            subject: "  Delivery ".into(),
            message: "Where is my order?".into(),
        },
    )
    .await?
    .data
    .expect("ticket");
    assert_eq!(ticket.subject, "Delivery");
    assert_eq!(ticket.status, TicketStatus::Open);

    let err = support_service::list_tickets(&fx.state, &user, TicketQuery::default())
        .await
        .expect_err("clients cannot list every ticket");
    assert!(matches!(err, AppError::Forbidden));

    for _ in 0..2 {
        let closed = support_service::close_ticket(&fx.state, &admin, ticket.id)
            .await?
            .data
            .expect("ticket");
        assert_eq!(closed.status, TicketStatus::Closed);
    }

    let open = support_service::list_tickets(
        &fx.state,
        &admin,
        TicketQuery {
            status: Some(TicketStatus::Open),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("tickets");
    assert!(open.items.is_empty());

    let mine = support_service::list_my_tickets(&fx.state, &user, TicketQuery::default())
        .await?
        .data
        .expect("tickets");
    assert_eq!(mine.items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn signup_registers_a_client_profile() -> anyhow::Result<()> {
    let fx = fixture();
    let token = fx.state.auth.issue(Uuid::new_v4(), Duration::minutes(5))?;
    let user_id = fx.state.auth.verify(&token)?;
    assert!(matches!(
        authorize(&fx.state, user_id).await,
        Err(AppError::Unauthorized)
    ));

    let err = profile_service::register(
        &fx.state,
        TokenSubject(user_id),
        RegisterProfileRequest {
            full_name: "   ".into(),
            email: "kofi@example.com".into(),
        },
    )
    .await
    .expect_err("blank name");
    assert!(matches!(err, AppError::BadRequest(_)));

    let created = profile_service::register(
        &fx.state,
        TokenSubject(user_id),
        RegisterProfileRequest {
            full_name: "  Kofi Mensah ".into(),
            email: "kofi@example.com".into(),
        },
    )
    .await?
    .data
    .expect("profile");
    assert_eq!(created.id, user_id);
    assert_eq!(created.role, Role::Client);
    assert_eq!(created.full_name.as_deref(), Some("Kofi Mensah"));

    let user = authorize(&fx.state, user_id).await?;
    assert_eq!(user.role, Role::Client);

    // Registering again returns the same profile.
    let again = profile_service::register(
        &fx.state,
        TokenSubject(user_id),
        RegisterProfileRequest {
            full_name: "Someone Else".into(),
            email: "else@example.com".into(),
        },
    )
    .await?
    .data
    .expect("profile");
    assert_eq!(again.full_name.as_deref(), Some("Kofi Mensah"));
    assert_eq!(fx.store.count_profiles().await?, 1);

    let err = profile_service::register(
        &fx.state,
        TokenSubject(Uuid::new_v4()),
        RegisterProfileRequest {
            full_name: "Copycat".into(),
            email: "kofi@example.com".into(),
        },
    )
    .await
    .expect_err("email taken");
    assert_eq!(err.code(), "conflict");
    Ok(())
}

#[tokio::test]
async fn profile_updates_keep_omitted_fields() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;

    let updated = profile_service::update_me(
        &fx.state,
        &user,
        UpdateProfileRequest {
            phone: Some(" 690123456 ".into()),
            avatar_url: Some("https://cdn.example.com/awa.png".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("profile");
    assert_eq!(updated.full_name.as_deref(), Some("awa"));
    assert_eq!(updated.phone.as_deref(), Some("690123456"));

    let err = profile_service::update_me(
        &fx.state,
        &user,
        UpdateProfileRequest {
            full_name: Some("".into()),
            ..Default::default()
        },
    )
    .await
    .expect_err("blank name");
    assert!(matches!(err, AppError::BadRequest(_)));

    profile_service::update_me(
        &fx.state,
        &user,
        UpdateProfileRequest {
            full_name: Some("Awa Ndiaye".into()),
            ..Default::default()
        },
    )
    .await?;
    let me = profile_service::get_me(&fx.state, &user)
        .await?
        .data
        .expect("profile");
    assert_eq!(me.full_name.as_deref(), Some("Awa Ndiaye"));
    assert_eq!(me.phone.as_deref(), Some("690123456"));
    assert_eq!(me.avatar_url.as_deref(), Some("https://cdn.example.com/awa.png"));
    assert_eq!(me.role, Role::Client);
    Ok(())
}
