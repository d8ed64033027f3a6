use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{
        HeadingFont, InfoScreenId, Principal, ServiceCapabilities, WebLinkId,
        DEFAULT_HEADING_TEXT,
    },
    error::{ApiError, ErrorCode},
    protocol::{ServiceCall, ServiceReply},
};
use tokio::sync::Notify;

use super::{ClientEvent, SiteClient};
use crate::{
    cache::QueryKey,
    config::{Settings, DEFAULT_ADMIN_PRINCIPAL},
    error::{ClientError, ServiceError, ServiceResult},
    forms::{LinkDraft, PostDraft},
    info_panel::InfoView,
    memory::InMemoryService,
    reorder::{ReorderError, ReorderPhase},
    service::RemoteService,
    validation::ValidationError,
};

fn default_admin() -> Principal {
    DEFAULT_ADMIN_PRINCIPAL.parse().expect("principal")
}

fn other_admin() -> Principal {
    "aaaaa-aa".parse().expect("principal")
}

fn settings() -> Settings {
    Settings {
        visit_retry_delay_ms: 10,
        ..Settings::default()
    }
}

fn seeded_memory() -> Arc<InMemoryService> {
    Arc::new(
        InMemoryService::new(default_admin())
            .with_admin(default_admin())
            .with_link("A", "https://a.example", "first")
            .with_link("B", "https://b.example", "second")
            .with_link("C", "https://c.example", "third"),
    )
}

fn site(memory: &Arc<InMemoryService>) -> Arc<SiteClient> {
    SiteClient::new(memory.clone(), settings())
}

async fn titles(client: &SiteClient) -> Vec<String> {
    client
        .displayed_links()
        .await
        .expect("links")
        .into_iter()
        .map(|link| link.title)
        .collect()
}

#[tokio::test]
async fn dragging_first_link_to_end_submits_visual_order() {
    let memory = seeded_memory();
    let client = site(&memory);

    client.enter_reordering().await.expect("enter");
    assert!(client.drag_start(WebLinkId(1)).await.expect("grab"));
    client.drag_over(1).await.expect("over 1");
    client.drag_over(2).await.expect("over 2");
    client.drop_at(2).await.expect("drop");
    assert_eq!(titles(&client).await, vec!["B", "C", "A"]);

    let saved = client.save_order().await.expect("save");
    assert_eq!(
        saved.iter().map(|link| link.id).collect::<Vec<_>>(),
        vec![WebLinkId(2), WebLinkId(3), WebLinkId(1)]
    );
    assert_eq!(client.reorder_phase().await, ReorderPhase::Idle);

    assert_eq!(memory.call_count("reorderWebLinks").await, 1);
    let submitted: Vec<_> = memory
        .calls()
        .await
        .into_iter()
        .filter_map(|call| match call {
            ServiceCall::ReorderWebLinks { new_order } => Some(new_order),
            _ => None,
        })
        .collect();
    assert_eq!(
        submitted,
        vec![vec![WebLinkId(2), WebLinkId(3), WebLinkId(1)]]
    );

    let ids: Vec<_> = client
        .web_links()
        .await
        .expect("reload")
        .into_iter()
        .map(|link| link.id)
        .collect();
    assert_eq!(ids, vec![WebLinkId(2), WebLinkId(3), WebLinkId(1)]);
}

/// Holds every reorder request until `release` is notified.
struct HeldReorder {
    inner: Arc<InMemoryService>,
    arrived: Notify,
    release: Notify,
}

#[async_trait]
impl RemoteService for HeldReorder {
    async fn call(&self, call: ServiceCall) -> ServiceResult<ServiceReply> {
        if matches!(call, ServiceCall::ReorderWebLinks { .. }) {
            self.arrived.notify_one();
            self.release.notified().await;
        }
        self.inner.call(call).await
    }
}

#[tokio::test]
async fn second_save_while_one_is_in_flight_is_refused() {
    let memory = seeded_memory();
    let held = Arc::new(HeldReorder {
        inner: memory.clone(),
        arrived: Notify::new(),
        release: Notify::new(),
    });
    let client = SiteClient::new(held.clone(), settings());

    client.enter_reordering().await.expect("enter");
    assert!(client.drag_start(WebLinkId(3)).await.expect("grab"));
    client.drag_over(0).await.expect("over");
    client.drop_at(0).await.expect("drop");

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.save_order().await }
    });
    held.arrived.notified().await;
    assert_eq!(client.reorder_phase().await, ReorderPhase::Saving);
    assert!(matches!(
        client.save_order().await,
        Err(ClientError::Reorder(ReorderError::InvalidPhase { .. }))
    ));
    assert!(client.cancel_reordering().await.is_err());

    held.release.notify_one();
    let saved = first.await.expect("join").expect("first save");
    assert_eq!(saved[0].id, WebLinkId(3));
    assert_eq!(memory.call_count("reorderWebLinks").await, 1);
    assert_eq!(client.reorder_phase().await, ReorderPhase::Idle);
}

#[tokio::test]
async fn saving_again_after_success_needs_a_new_session() {
    let memory = seeded_memory();
    let client = site(&memory);

    client.enter_reordering().await.expect("enter");
    client.save_order().await.expect("first save");
    assert!(matches!(
        client.save_order().await,
        Err(ClientError::Reorder(ReorderError::InvalidPhase { .. }))
    ));
    assert_eq!(memory.call_count("reorderWebLinks").await, 1);
}

#[tokio::test]
async fn failed_save_keeps_working_copy_and_cache() {
    let memory = seeded_memory();
    let client = site(&memory);
    let mut events = client.subscribe_events();

    client.enter_reordering().await.expect("enter");
    client.drag_start(WebLinkId(3)).await.expect("grab");
    client.drag_over(0).await.expect("over");
    client.drop_at(0).await.expect("drop");

    memory
        .fail_next(
            "reorderWebLinks",
            1,
            ServiceError::Rejected(ApiError::new(ErrorCode::Internal, "trap")),
        )
        .await;
    let err = client.save_order().await.expect_err("rejected");
    assert!(matches!(err, ClientError::Service(ServiceError::Rejected(_))));

    assert_eq!(client.reorder_phase().await, ReorderPhase::Reordering);
    assert_eq!(titles(&client).await, vec!["C", "A", "B"]);
    assert!(
        client
            .inspect_links(|links| links.reorder().last_error().is_some())
            .await
    );
    assert!(
        !client
            .inspect_cache(|cache| cache.is_invalidated(QueryKey::WebLinks))
            .await
    );
    assert_eq!(
        memory.ordered_link_ids().await,
        vec![WebLinkId(1), WebLinkId(2), WebLinkId(3)]
    );

    let mut saw_invalidation = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, ClientEvent::QueryInvalidated(_)) {
            saw_invalidation = true;
        }
    }
    assert!(!saw_invalidation);

    client.save_order().await.expect("retry save");
    assert_eq!(
        memory.ordered_link_ids().await,
        vec![WebLinkId(3), WebLinkId(1), WebLinkId(2)]
    );
}

#[tokio::test]
async fn cancel_restores_server_order_without_a_request() {
    let memory = seeded_memory();
    let client = site(&memory);

    client.enter_reordering().await.expect("enter");
    client.drag_start(WebLinkId(1)).await.expect("grab");
    client.drag_over(2).await.expect("over");
    client.drag_end().await;

    let original = client.cancel_reordering().await.expect("cancel");
    assert_eq!(
        original.iter().map(|link| link.id).collect::<Vec<_>>(),
        vec![WebLinkId(1), WebLinkId(2), WebLinkId(3)]
    );
    assert_eq!(titles(&client).await, vec!["A", "B", "C"]);
    assert_eq!(memory.call_count("reorderWebLinks").await, 0);
}

#[tokio::test]
async fn reordering_needs_two_links_and_no_open_edit() {
    let memory = Arc::new(
        InMemoryService::new(default_admin())
            .with_admin(default_admin())
            .with_link("Only", "https://only.example", ""),
    );
    let client = site(&memory);
    assert!(matches!(
        client.enter_reordering().await,
        Err(ClientError::Reorder(ReorderError::TooFewLinks { count: 1 }))
    ));
    assert_eq!(client.reorder_phase().await, ReorderPhase::Idle);

    let memory = seeded_memory();
    let client = site(&memory);
    client.start_edit_link(WebLinkId(2)).await.expect("edit");
    assert!(matches!(
        client.enter_reordering().await,
        Err(ClientError::Reorder(ReorderError::EditInProgress))
    ));
    assert_eq!(client.reorder_phase().await, ReorderPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn visit_increment_retries_until_it_lands_once() {
    let memory = Arc::new(InMemoryService::default().with_visit_count(41));
    memory
        .fail_next(
            "incrementVisitCount",
            2,
            ServiceError::Transport("connection reset".into()),
        )
        .await;
    let client = site(&memory);

    assert!(client.record_session_start().await.expect("counted"));
    assert_eq!(memory.call_count("incrementVisitCount").await, 3);
    assert_eq!(memory.visit_count().await, 42);
    assert_eq!(client.visit_count().await.expect("count"), 42);

    assert!(!client.record_session_start().await.expect("same session"));
    assert!(!client.record_visible().await.expect("too soon"));
    assert_eq!(memory.call_count("incrementVisitCount").await, 3);
}

#[tokio::test(start_paused = true)]
async fn visit_increment_gives_up_after_configured_attempts() {
    let memory = Arc::new(InMemoryService::default());
    memory
        .fail_next(
            "incrementVisitCount",
            5,
            ServiceError::Transport("down".into()),
        )
        .await;
    let client = site(&memory);

    assert!(client.record_session_start().await.is_err());
    assert_eq!(memory.call_count("incrementVisitCount").await, 3);
    assert_eq!(memory.visit_count().await, 0);
}

#[tokio::test]
async fn anonymous_caller_gets_no_admin_affordances() {
    let memory = seeded_memory();
    memory.set_caller(Principal::anonymous()).await;
    let client = site(&memory);

    assert!(!client.affordances().await.any());
    assert!(client.admins().await.expect("admins").is_empty());
    assert_eq!(
        client.start_add_link().await,
        Err(ClientError::AdminOnly("add a link"))
    );
    assert!(matches!(
        client.enter_reordering().await,
        Err(ClientError::Reorder(ReorderError::NotAdmin))
    ));
    assert_eq!(memory.call_count("getAllAdminPrincipals").await, 0);
}

#[tokio::test]
async fn offline_client_reads_empty_and_refuses_mutations() {
    let client = SiteClient::offline(settings());

    assert!(client.web_links().await.expect("links").is_empty());
    assert_eq!(client.visit_count().await.expect("count"), 0);
    assert!(!client.is_caller_admin().await);
    assert_eq!(client.heading_config().await.text, DEFAULT_HEADING_TEXT);
    assert!(matches!(
        client.initialize_access_control().await,
        Err(ClientError::Service(ServiceError::Unavailable))
    ));
}

#[tokio::test]
async fn link_crud_invalidates_lazily() {
    let memory = seeded_memory();
    let client = site(&memory);
    client.web_links().await.expect("load");

    client.start_add_link().await.expect("form");
    client
        .set_link_draft(LinkDraft {
            title: "D".into(),
            url: "not a url".into(),
            description: String::new(),
        })
        .await;
    assert!(matches!(
        client.submit_link().await,
        Err(ClientError::Validation(ValidationError::InvalidUrl { .. }))
    ));
    assert_eq!(memory.call_count("addWebLink").await, 0);

    client
        .set_link_draft(LinkDraft {
            title: "D".into(),
            url: "https://d.example".into(),
            description: String::new(),
        })
        .await;
    let fetches_before = memory.call_count("getOrderedWebLinks").await;
    client.submit_link().await.expect("add");
    assert!(
        client
            .inspect_cache(|cache| cache.is_invalidated(QueryKey::WebLinks))
            .await
    );
    assert_eq!(
        memory.call_count("getOrderedWebLinks").await,
        fetches_before,
        "link mutations refetch on next access"
    );
    assert!(!client.inspect_links(|links| links.form().is_open()).await);

    assert_eq!(titles(&client).await, vec!["A", "B", "C", "D"]);
    client.delete_link(WebLinkId(4)).await.expect("delete");
    assert_eq!(titles(&client).await, vec!["A", "B", "C"]);
}

#[tokio::test]
async fn rejected_post_keeps_draft_and_cache() {
    let memory = seeded_memory();
    let client = site(&memory);
    client.blog_posts().await.expect("load");

    client.start_add_post().await.expect("form");
    client
        .set_post_draft(PostDraft {
            title: "Hello".into(),
            content: "World".into(),
        })
        .await;
    memory
        .fail_next(
            "addBlogPost",
            1,
            ServiceError::Rejected(ApiError::new(ErrorCode::Internal, "full")),
        )
        .await;
    assert!(client.submit_post().await.is_err());
    assert!(client.inspect_blog(|blog| blog.form().is_open()).await);
    assert!(
        !client
            .inspect_cache(|cache| cache.is_invalidated(QueryKey::BlogPosts))
            .await
    );

    client.submit_post().await.expect("second try");
    let posts = client.blog_posts().await.expect("posts");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Hello");
}

#[tokio::test]
async fn new_post_is_authored_by_the_caller() {
    let memory = seeded_memory();
    let client = site(&memory);

    client.start_add_post().await.expect("form");
    client
        .set_post_draft(PostDraft {
            title: "Hello".into(),
            content: "World".into(),
        })
        .await;
    client.submit_post().await.expect("post");

    let posts = client.blog_posts().await.expect("posts");
    assert_eq!(posts[0].author, default_admin());
}

#[tokio::test]
async fn editing_a_post_keeps_author_and_timestamp() {
    let memory = Arc::new(
        InMemoryService::new(default_admin())
            .with_admin(default_admin())
            .with_post("Draft", "First version"),
    );
    let client = site(&memory);
    let before = client.blog_posts().await.expect("posts")[0].clone();

    client.start_edit_post(before.id).await.expect("edit form");
    client
        .set_post_draft(PostDraft {
            title: "Final".into(),
            content: "Second version".into(),
        })
        .await;
    client.submit_post().await.expect("edit");

    let after = client.blog_posts().await.expect("posts")[0].clone();
    assert_eq!(after.title, "Final");
    assert_eq!(after.content, "Second version");
    assert_eq!(after.author, before.author);
    assert_eq!(after.timestamp, before.timestamp);
}

#[tokio::test]
async fn user_profiles_are_readable_by_admins_only() {
    let memory = seeded_memory();
    let client = site(&memory);
    client.save_profile("Owner").await.expect("profile");

    assert_eq!(
        client
            .user_profile(&default_admin())
            .await
            .expect("own profile")
            .map(|profile| profile.name),
        Some("Owner".to_string())
    );
    assert_eq!(
        client.user_profile(&other_admin()).await.expect("missing"),
        None
    );

    memory.set_caller(other_admin()).await;
    client.reset_identity().await;
    assert!(matches!(
        client.user_profile(&default_admin()).await,
        Err(ClientError::Service(ServiceError::Rejected(api))) if api.code == ErrorCode::Forbidden
    ));
}

#[tokio::test]
async fn default_admin_cannot_be_removed() {
    let memory = seeded_memory();
    let client = site(&memory);

    assert_eq!(
        client.add_admin("  aaaaa-aa ").await.expect("add"),
        other_admin()
    );
    let admins = client.admins().await.expect("admins");
    assert_eq!(admins.len(), 2);
    assert!(!admins[0].removable);
    assert!(admins[1].removable);

    assert_eq!(
        client.remove_admin(&default_admin()).await,
        Err(ClientError::ProtectedAdmin(default_admin()))
    );
    assert_eq!(memory.call_count("assignCallerUserRole").await, 1);

    client.remove_admin(&other_admin()).await.expect("remove");
    assert_eq!(client.admins().await.expect("admins").len(), 1);

    assert!(matches!(
        client.add_admin("Bad Principal").await,
        Err(ClientError::Validation(ValidationError::InvalidPrincipal(_)))
    ));
}

#[tokio::test]
async fn heading_edits_need_the_capability() {
    let memory = seeded_memory();
    let client = site(&memory);
    assert_eq!(
        client.update_heading_config("Hi", "serif", "#ffffff").await,
        Err(ClientError::Unsupported("heading configuration"))
    );

    let memory = Arc::new(
        InMemoryService::new(default_admin())
            .with_admin(default_admin())
            .with_capabilities(Some(ServiceCapabilities {
                heading_config: true,
                info_screens: false,
            })),
    );
    let client = site(&memory);
    assert!(matches!(
        client.update_heading_config("Hi", "serif", "red").await,
        Err(ClientError::Validation(ValidationError::InvalidColor(_)))
    ));
    let saved = client
        .update_heading_config(" Hi ", "serif", "#AABBCC")
        .await
        .expect("update");
    assert_eq!(saved.font, HeadingFont::Serif);
    assert_eq!(client.heading_config().await, saved);
}

#[tokio::test]
async fn legacy_probe_rejection_means_no_optional_features() {
    let memory = Arc::new(
        InMemoryService::new(default_admin())
            .with_admin(default_admin())
            .with_capabilities(None),
    );
    let client = site(&memory);
    assert_eq!(client.capabilities().await, ServiceCapabilities::default());
    assert_eq!(client.heading_config().await.text, DEFAULT_HEADING_TEXT);
    assert_eq!(memory.call_count("getHeadingConfig").await, 0);
}

#[tokio::test]
async fn info_screens_stay_local_without_the_capability() {
    let memory = seeded_memory();
    let client = site(&memory);
    client.bootstrap().await;

    client.start_managing_screens().await.expect("manage");
    let screen = client
        .add_info_screen("Sixth", "More")
        .await
        .expect("add locally");
    assert_eq!(screen.id, InfoScreenId(5));
    assert!(client
        .delete_info_screen(InfoScreenId(0))
        .await
        .expect("delete"));
    client.stop_managing_screens().await;

    assert_eq!(memory.call_count("addCaffeineInfoScreen").await, 0);
    assert_eq!(
        client
            .inspect_info_panel(|panel| panel.draft().screens().len())
            .await,
        5
    );
}

#[tokio::test]
async fn info_screens_are_persisted_when_advertised() {
    let memory = Arc::new(
        InMemoryService::new(default_admin())
            .with_admin(default_admin())
            .with_capabilities(Some(ServiceCapabilities {
                heading_config: false,
                info_screens: true,
            })),
    );
    let client = site(&memory);

    client.start_managing_screens().await.expect("manage");
    client
        .set_info_section_title("About us")
        .await
        .expect("title");
    client.stop_managing_screens().await;
    assert_eq!(memory.call_count("updateCaffeineInfoSectionTitle").await, 1);

    client
        .refetch(QueryKey::InfoPanelConfig)
        .await
        .expect("reload");
    let title = client
        .inspect_info_panel(|panel| panel.draft().section_title().to_string())
        .await;
    assert_eq!(title, "About us");
}

#[tokio::test]
async fn added_info_screen_carries_the_service_assigned_id() {
    let memory = Arc::new(
        InMemoryService::new(default_admin())
            .with_admin(default_admin())
            .with_capabilities(Some(ServiceCapabilities {
                heading_config: false,
                info_screens: true,
            })),
    );
    let client = site(&memory);
    client.bootstrap().await;
    client.start_managing_screens().await.expect("manage");

    assert!(client
        .delete_info_screen(InfoScreenId(4))
        .await
        .expect("delete"));
    let screen = client
        .add_info_screen("Hours", "Open daily")
        .await
        .expect("add");
    assert_eq!(screen.id, InfoScreenId(5));

    let edited = client
        .edit_info_screen(screen.id, "Hours", "Open on weekdays")
        .await
        .expect("edit the new screen");
    assert_eq!(edited.content, "Open on weekdays");

    let ids: Vec<_> = client
        .inspect_info_panel(|panel| panel.draft().screens().iter().map(|s| s.id).collect())
        .await;
    assert_eq!(
        ids,
        vec![
            InfoScreenId(0),
            InfoScreenId(1),
            InfoScreenId(2),
            InfoScreenId(3),
            InfoScreenId(5)
        ]
    );
}

#[tokio::test]
async fn legacy_info_record_takes_over_the_panel() {
    let memory = Arc::new(
        InMemoryService::new(default_admin())
            .with_admin(default_admin())
            .with_caffeine_info("Legacy text"),
    );
    let client = site(&memory);
    client.bootstrap().await;

    let is_legacy = client
        .inspect_info_panel(|panel| matches!(panel.view(), InfoView::Legacy(_)))
        .await;
    assert!(is_legacy);
    assert!(!client.info_tick().await);

    client.start_info_edit().await.expect("edit");
    client.set_info_draft("Updated").await;
    client.save_info().await.expect("save");
    assert_eq!(
        client
            .caffeine_info()
            .await
            .expect("info")
            .map(|info| info.content),
        Some("Updated".to_string())
    );
}

#[tokio::test]
async fn identity_change_clears_cached_role() {
    let memory = seeded_memory();
    let client = site(&memory);
    assert!(client.is_caller_admin().await);

    memory.set_caller(other_admin()).await;
    client.reset_identity().await;
    assert!(!client.is_caller_admin().await);
    assert_eq!(
        client
            .inspect_cache(|cache| cache.is_caller_admin())
            .await,
        Some(false)
    );
}

#[tokio::test]
async fn focus_refetches_stale_queries_but_not_posts() {
    let memory = seeded_memory();
    let client = site(&memory);
    client.web_links().await.expect("links");
    client.blog_posts().await.expect("posts");

    let refetched = client.on_window_focus().await;
    assert!(refetched.contains(&QueryKey::WebLinks));
    assert!(!refetched.contains(&QueryKey::BlogPosts));
}
