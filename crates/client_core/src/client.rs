use std::{future::Future, sync::Arc, time::Instant};

use futures::future::join_all;
use shared::{
    domain::{
        BlogPost, BlogPostId, CaffeineInfo, HeadingConfig, HeadingFont, InfoScreen, InfoScreenId,
        Principal, ServiceCapabilities, UserProfile, UserRole, WebLink, WebLinkId,
    },
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    blog::{BlogController, PostSubmission},
    cache::{QueryCache, QueryData, QueryKey},
    config::Settings,
    error::{ClientError, ClientResult, ServiceError, ServiceResult},
    forms::{LinkDraft, PostDraft},
    gate::{AdminEntry, Affordances, RoleGate},
    info_panel::InfoPanel,
    invalidation::Mutation,
    links::{LinkSubmission, LinksController},
    reorder::ReorderPhase,
    service::{MissingRemoteService, RemoteService, ServiceClient},
    validation::{
        parse_principal, validate_heading, validate_profile_name, validate_screen,
        validate_section_title,
    },
    visits::{retry, RetryPolicy, VisitSession},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    QueryUpdated(QueryKey),
    QueryInvalidated(QueryKey),
    ReorderPhaseChanged(ReorderPhase),
    Error(String),
}

fn reload_missed(mutation: Mutation) -> ClientError {
    ClientError::Service(ServiceError::UnexpectedReply {
        call: mutation.name(),
        got: "reload without the change",
    })
}

struct SiteState {
    cache: QueryCache,
    links: LinksController,
    blog: BlogController,
    info: InfoPanel,
    visits: VisitSession,
}

/// Everything the site UI needs: cached queries, the section controllers and
/// the mutations that keep the cache in step with the service.
///
/// State lives behind one mutex that is never held across a remote call.
pub struct SiteClient {
    service: ServiceClient,
    settings: Settings,
    gate: RoleGate,
    inner: Mutex<SiteState>,
    events: broadcast::Sender<ClientEvent>,
}

impl SiteClient {
    pub fn new(remote: Arc<dyn RemoteService>, settings: Settings) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        let gate = RoleGate::new(settings.default_admin());
        let visits = VisitSession::start(settings.revisit_after());
        Arc::new(Self {
            service: ServiceClient::new(remote),
            settings,
            gate,
            inner: Mutex::new(SiteState {
                cache: QueryCache::new(),
                links: LinksController::new(),
                blog: BlogController::new(),
                info: InfoPanel::new(),
                visits,
            }),
            events,
        })
    }

    /// Client with no backend yet; reads resolve to empty values.
    pub fn offline(settings: Settings) -> Arc<Self> {
        Self::new(Arc::new(MissingRemoteService), settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn gate(&self) -> &RoleGate {
        &self.gate
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    pub async fn inspect_cache<R>(&self, f: impl FnOnce(&QueryCache) -> R) -> R {
        f(&self.inner.lock().await.cache)
    }

    pub async fn inspect_links<R>(&self, f: impl FnOnce(&LinksController) -> R) -> R {
        f(&self.inner.lock().await.links)
    }

    pub async fn inspect_blog<R>(&self, f: impl FnOnce(&BlogController) -> R) -> R {
        f(&self.inner.lock().await.blog)
    }

    pub async fn inspect_info_panel<R>(&self, f: impl FnOnce(&InfoPanel) -> R) -> R {
        f(&self.inner.lock().await.info)
    }

    // -- queries --------------------------------------------------------------

    /// Cached capabilities, probing the service on first use. A failed probe
    /// is not cached and counts as no optional features.
    pub async fn capabilities(&self) -> ServiceCapabilities {
        if let Some(caps) = self.inner.lock().await.cache.capabilities() {
            return caps;
        }
        let ticket = self
            .inner
            .lock()
            .await
            .cache
            .begin_fetch(QueryKey::Capabilities);
        match self.service.capabilities().await {
            Ok(caps) => {
                let mut state = self.inner.lock().await;
                state
                    .cache
                    .store(ticket, QueryData::Capabilities(caps), Instant::now());
                caps
            }
            Err(err) => {
                warn!(error = %err, "capabilities: probe failed");
                ServiceCapabilities::default()
            }
        }
    }

    async fn fetch_query(&self, key: QueryKey) -> ServiceResult<QueryData> {
        let service = &self.service;
        Ok(match key {
            QueryKey::CurrentUserProfile => {
                QueryData::Profile(service.get_caller_user_profile().await?)
            }
            QueryKey::IsCallerAdmin => QueryData::Flag(service.is_caller_admin().await?),
            QueryKey::AdminPrincipals => {
                QueryData::Principals(service.get_all_admin_principals().await?)
            }
            QueryKey::VisitCount => QueryData::Count(service.get_visit_count().await?),
            QueryKey::HeadingConfig => {
                if self.capabilities().await.heading_config {
                    QueryData::HeadingConfig(service.get_heading_config().await?)
                } else {
                    QueryData::HeadingConfig(None)
                }
            }
            QueryKey::BlogPosts => QueryData::BlogPosts(service.get_all_blog_posts().await?),
            QueryKey::WebLinks => QueryData::WebLinks(service.get_ordered_web_links().await?),
            QueryKey::CaffeineInfo => QueryData::CaffeineInfo(service.get_caffeine_info().await?),
            QueryKey::InfoPanelConfig => {
                if self.capabilities().await.info_screens {
                    QueryData::InfoPanelConfig(service.get_info_panel_config().await?)
                } else {
                    QueryData::InfoPanelConfig(None)
                }
            }
            QueryKey::Capabilities => QueryData::Capabilities(service.capabilities().await?),
        })
    }

    fn sync_derived(state: &mut SiteState, data: &QueryData) {
        match data {
            QueryData::CaffeineInfo(info) => state.info.set_legacy(info.clone()),
            QueryData::InfoPanelConfig(Some(config)) => state.info.load_remote(config.clone()),
            _ => {}
        }
    }

    /// Fetches `key` and stores the result unless it was invalidated meanwhile.
    pub async fn refetch(&self, key: QueryKey) -> ClientResult<()> {
        let ticket = self.inner.lock().await.cache.begin_fetch(key);
        match self.fetch_query(key).await {
            Ok(data) => {
                let stored = {
                    let mut state = self.inner.lock().await;
                    let stored = state.cache.store(ticket, data.clone(), Instant::now());
                    if stored {
                        Self::sync_derived(&mut state, &data);
                    }
                    stored
                };
                if stored {
                    self.emit(ClientEvent::QueryUpdated(key));
                } else {
                    debug!(key = key.name(), "query: dropping superseded result");
                }
                Ok(())
            }
            Err(err) => {
                warn!(key = key.name(), error = %err, "query: fetch failed");
                self.emit(ClientEvent::Error(format!("{}: {err}", key.name())));
                Err(err.into())
            }
        }
    }

    /// Fetches `key` when it is missing or stale.
    pub async fn ensure(&self, key: QueryKey) -> ClientResult<()> {
        let needed = self
            .inner
            .lock()
            .await
            .cache
            .on_mount(key, Instant::now());
        if needed {
            self.refetch(key).await
        } else {
            Ok(())
        }
    }

    async fn refetch_each(&self, keys: Vec<QueryKey>) -> Vec<QueryKey> {
        for key in &keys {
            if let Err(err) = self.refetch(*key).await {
                debug!(key = key.name(), error = %err, "query: background refetch failed");
            }
        }
        keys
    }

    pub async fn web_links(&self) -> ClientResult<Vec<WebLink>> {
        self.ensure(QueryKey::WebLinks).await?;
        let state = self.inner.lock().await;
        Ok(state.cache.web_links().map(<[WebLink]>::to_vec).unwrap_or_default())
    }

    /// Links as currently shown: the working copy while reordering.
    pub async fn displayed_links(&self) -> ClientResult<Vec<WebLink>> {
        self.ensure(QueryKey::WebLinks).await?;
        let state = self.inner.lock().await;
        let server = state.cache.web_links().unwrap_or_default();
        Ok(state.links.reorder().display_order(server).to_vec())
    }

    pub async fn blog_posts(&self) -> ClientResult<Vec<BlogPost>> {
        self.ensure(QueryKey::BlogPosts).await?;
        let state = self.inner.lock().await;
        Ok(state.cache.blog_posts().map(<[BlogPost]>::to_vec).unwrap_or_default())
    }

    pub async fn caffeine_info(&self) -> ClientResult<Option<CaffeineInfo>> {
        self.ensure(QueryKey::CaffeineInfo).await?;
        let state = self.inner.lock().await;
        Ok(state.cache.caffeine_info().flatten().cloned())
    }

    pub async fn visit_count(&self) -> ClientResult<u64> {
        self.ensure(QueryKey::VisitCount).await?;
        Ok(self.inner.lock().await.cache.visit_count().unwrap_or(0))
    }

    pub async fn caller_profile(&self) -> ClientResult<Option<UserProfile>> {
        self.ensure(QueryKey::CurrentUserProfile).await?;
        let state = self.inner.lock().await;
        Ok(match state.cache.get(QueryKey::CurrentUserProfile) {
            Some(QueryData::Profile(profile)) => profile.clone(),
            _ => None,
        })
    }

    /// Profile of any user. The service answers this for admins and for the
    /// user's own principal only; it is not cached.
    pub async fn user_profile(&self, user: &Principal) -> ClientResult<Option<UserProfile>> {
        Ok(self.service.get_user_profile(user).await?)
    }

    pub async fn caller_role(&self) -> ClientResult<UserRole> {
        Ok(self.service.get_caller_user_role().await?)
    }

    /// Links in the order they were created, ignoring any saved arrangement.
    pub async fn links_by_creation(&self) -> ClientResult<Vec<WebLink>> {
        Ok(self.service.get_all_web_links().await?)
    }

    /// `false` until the service confirms the admin role, and on any error.
    pub async fn is_caller_admin(&self) -> bool {
        if let Err(err) = self.ensure(QueryKey::IsCallerAdmin).await {
            debug!(error = %err, "gate: admin check failed, treating caller as non-admin");
        }
        self.gate.is_admin(&self.inner.lock().await.cache)
    }

    pub async fn affordances(&self) -> Affordances {
        self.is_caller_admin().await;
        self.gate.affordances(&self.inner.lock().await.cache)
    }

    /// Admin list for the management panel; empty for everyone else.
    pub async fn admins(&self) -> ClientResult<Vec<AdminEntry>> {
        if !self.is_caller_admin().await {
            return Ok(Vec::new());
        }
        self.ensure(QueryKey::AdminPrincipals).await?;
        Ok(self.gate.visible_admins(&self.inner.lock().await.cache))
    }

    pub async fn heading_config(&self) -> HeadingConfig {
        if !self.capabilities().await.heading_config {
            return HeadingConfig::default();
        }
        if let Err(err) = self.ensure(QueryKey::HeadingConfig).await {
            debug!(error = %err, "heading: falling back to defaults");
        }
        match self.inner.lock().await.cache.get(QueryKey::HeadingConfig) {
            Some(QueryData::HeadingConfig(Some(config))) => config.clone(),
            _ => HeadingConfig::default(),
        }
    }

    /// Loads what the landing page shows. Individual failures are logged and
    /// leave that section empty.
    pub async fn bootstrap(&self) {
        let caps = self.capabilities().await;
        info!(
            heading_config = caps.heading_config,
            info_screens = caps.info_screens,
            "site: bootstrapping"
        );
        let mut keys = vec![
            QueryKey::IsCallerAdmin,
            QueryKey::WebLinks,
            QueryKey::BlogPosts,
            QueryKey::CaffeineInfo,
            QueryKey::VisitCount,
        ];
        if caps.heading_config {
            keys.push(QueryKey::HeadingConfig);
        }
        if caps.info_screens {
            keys.push(QueryKey::InfoPanelConfig);
        }
        let results = join_all(keys.iter().map(|key| self.ensure(*key))).await;
        for (key, result) in keys.iter().zip(results) {
            if let Err(err) = result {
                debug!(key = key.name(), error = %err, "site: section left empty");
            }
        }
    }

    // -- lifecycle ------------------------------------------------------------

    pub async fn on_window_focus(&self) -> Vec<QueryKey> {
        let keys = self.inner.lock().await.cache.on_window_focus(Instant::now());
        self.refetch_each(keys).await
    }

    pub async fn on_reconnect(&self) -> Vec<QueryKey> {
        let keys = self.inner.lock().await.cache.on_reconnect(Instant::now());
        self.refetch_each(keys).await
    }

    pub async fn poll_intervals(&self) -> Vec<QueryKey> {
        let keys = self.inner.lock().await.cache.due_for_interval(Instant::now());
        self.refetch_each(keys).await
    }

    /// Drops every cached result, e.g. after the caller's identity changed.
    pub async fn reset_identity(&self) {
        self.inner.lock().await.cache.clear();
        info!("site: cache cleared for new identity");
    }

    // -- mutations ------------------------------------------------------------

    async fn apply_plan(&self, mutation: Mutation) {
        let plan = mutation.plan();
        let refetch = {
            let mut state = self.inner.lock().await;
            plan.apply(&mut state.cache)
        };
        for key in &plan.invalidate {
            self.emit(ClientEvent::QueryInvalidated(*key));
        }
        self.refetch_each(refetch).await;
    }

    /// Sends one mutation; only a confirmed success touches the cache.
    /// Mutations that retry on their own are re-sent per the settings policy.
    async fn run_mutation<F, Fut>(&self, mutation: Mutation, mut send: F) -> ClientResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ServiceResult<()>>,
    {
        let policy = if mutation.retries_automatically() {
            self.settings.retry_policy()
        } else {
            RetryPolicy::once()
        };
        info!(mutation = mutation.name(), "mutation: sending");
        let sent = retry(policy, mutation.name(), |attempt| {
            debug!(mutation = mutation.name(), attempt, "mutation: attempt");
            send()
        })
        .await;
        if let Err(err) = sent {
            warn!(mutation = mutation.name(), error = %err, "mutation: failed");
            self.emit(ClientEvent::Error(format!("{}: {err}", mutation.name())));
            return Err(err.into());
        }
        self.apply_plan(mutation).await;
        Ok(())
    }

    async fn require_admin(&self, action: &'static str) -> ClientResult<()> {
        if self.is_caller_admin().await {
            Ok(())
        } else {
            Err(ClientError::AdminOnly(action))
        }
    }

    pub async fn initialize_access_control(&self) -> ClientResult<()> {
        self.run_mutation(Mutation::InitializeAccessControl, || {
            self.service.initialize_access_control()
        })
        .await
    }

    pub async fn save_profile(&self, name: &str) -> ClientResult<()> {
        let profile = UserProfile {
            name: validate_profile_name(name)?,
        };
        self.run_mutation(Mutation::SaveCallerUserProfile, || {
            self.service.save_caller_user_profile(profile.clone())
        })
        .await
    }

    // links

    pub async fn start_add_link(&self) -> ClientResult<()> {
        let is_admin = self.is_caller_admin().await;
        self.inner.lock().await.links.start_add(is_admin)
    }

    pub async fn start_edit_link(&self, id: WebLinkId) -> ClientResult<()> {
        let is_admin = self.is_caller_admin().await;
        self.ensure(QueryKey::WebLinks).await?;
        let mut state = self.inner.lock().await;
        let link = state
            .cache
            .web_links()
            .and_then(|links| links.iter().find(|link| link.id == id))
            .cloned()
            .ok_or(ClientError::FormBlocked {
                action: "edit a link",
                reason: "no such link",
            })?;
        state.links.start_edit(&link, is_admin)
    }

    pub async fn set_link_draft(&self, draft: LinkDraft) -> bool {
        self.inner.lock().await.links.set_draft(draft)
    }

    pub async fn cancel_link_form(&self) {
        self.inner.lock().await.links.cancel_form();
    }

    /// Sends the open link form. A failed call leaves the form and its draft open.
    pub async fn submit_link(&self) -> ClientResult<()> {
        let submission = self.inner.lock().await.links.submission()?;
        let service = &self.service;
        match &submission {
            LinkSubmission::Add(input) => {
                self.run_mutation(Mutation::AddWebLink, || {
                    service.add_web_link(&input.title, &input.url, &input.description)
                })
                .await?
            }
            LinkSubmission::Edit(id, input) => {
                self.run_mutation(Mutation::EditWebLink, || {
                    service.edit_web_link(*id, &input.title, &input.url, &input.description)
                })
                .await?
            }
        }
        self.inner.lock().await.links.submission_succeeded();
        Ok(())
    }

    pub async fn delete_link(&self, id: WebLinkId) -> ClientResult<()> {
        self.require_admin("delete a link").await?;
        if !self.inner.lock().await.links.can_delete(true) {
            return Err(ClientError::FormBlocked {
                action: "delete a link",
                reason: "links are being reordered",
            });
        }
        self.run_mutation(Mutation::DeleteWebLink, || self.service.delete_web_link(id))
            .await
    }

    // reorder

    pub async fn reorder_phase(&self) -> ReorderPhase {
        self.inner.lock().await.links.phase()
    }

    fn phase_changed(&self, phase: ReorderPhase) {
        self.emit(ClientEvent::ReorderPhaseChanged(phase));
    }

    pub async fn enter_reordering(&self) -> ClientResult<()> {
        let is_admin = self.is_caller_admin().await;
        self.ensure(QueryKey::WebLinks).await?;
        {
            let mut state = self.inner.lock().await;
            let SiteState { cache, links, .. } = &mut *state;
            let server = cache.web_links().unwrap_or_default();
            links.enter_reordering(server, is_admin)?;
        }
        self.phase_changed(ReorderPhase::Reordering);
        Ok(())
    }

    pub async fn drag_start(&self, id: WebLinkId) -> ClientResult<bool> {
        let started = self.inner.lock().await.links.drag_start(id)?;
        if started {
            self.phase_changed(ReorderPhase::Dragging);
        }
        Ok(started)
    }

    pub async fn drag_over(&self, target_index: usize) -> ClientResult<bool> {
        Ok(self.inner.lock().await.links.drag_over(target_index)?)
    }

    pub async fn drop_at(&self, target_index: usize) -> ClientResult<()> {
        self.inner.lock().await.links.drop_at(target_index)?;
        self.phase_changed(ReorderPhase::Reordering);
        Ok(())
    }

    pub async fn drag_end(&self) {
        self.inner.lock().await.links.drag_end();
    }

    /// Submits the working order as shown. Exactly one request per save; the
    /// state machine refuses a second save while one is in flight.
    pub async fn save_order(&self) -> ClientResult<Vec<WebLink>> {
        let order = self.inner.lock().await.links.begin_save()?;
        self.phase_changed(ReorderPhase::Saving);
        info!(link_count = order.len(), "links: saving order");

        match self.service.reorder_web_links(order).await {
            Ok(()) => {
                let saved = {
                    let mut state = self.inner.lock().await;
                    let saved = state.links.save_succeeded()?;
                    state.cache.set(
                        QueryKey::WebLinks,
                        QueryData::WebLinks(saved.clone()),
                        Instant::now(),
                    );
                    saved
                };
                self.phase_changed(ReorderPhase::Idle);
                self.apply_plan(Mutation::ReorderWebLinks).await;
                Ok(saved)
            }
            Err(err) => {
                warn!(error = %err, "links: saving order failed");
                self.inner.lock().await.links.save_failed(&err)?;
                self.phase_changed(ReorderPhase::Reordering);
                self.emit(ClientEvent::Error(format!("reorderWebLinks: {err}")));
                Err(err.into())
            }
        }
    }

    pub async fn cancel_reordering(&self) -> ClientResult<Vec<WebLink>> {
        let original = self.inner.lock().await.links.cancel_reordering()?;
        self.phase_changed(ReorderPhase::Idle);
        Ok(original)
    }

    // blog

    pub async fn start_add_post(&self) -> ClientResult<()> {
        let is_admin = self.is_caller_admin().await;
        self.inner.lock().await.blog.start_add(is_admin)
    }

    pub async fn start_edit_post(&self, id: BlogPostId) -> ClientResult<()> {
        let is_admin = self.is_caller_admin().await;
        self.ensure(QueryKey::BlogPosts).await?;
        let mut state = self.inner.lock().await;
        let post = state
            .cache
            .blog_posts()
            .and_then(|posts| posts.iter().find(|post| post.id == id))
            .cloned()
            .ok_or(ClientError::FormBlocked {
                action: "edit a post",
                reason: "no such post",
            })?;
        state.blog.start_edit(&post, is_admin)
    }

    pub async fn set_post_draft(&self, draft: PostDraft) -> bool {
        self.inner.lock().await.blog.set_draft(draft)
    }

    pub async fn cancel_post_form(&self) {
        self.inner.lock().await.blog.cancel_form();
    }

    pub async fn submit_post(&self) -> ClientResult<()> {
        let submission = self.inner.lock().await.blog.submission()?;
        let service = &self.service;
        match &submission {
            PostSubmission::Add(input) => {
                self.run_mutation(Mutation::AddBlogPost, || {
                    service.add_blog_post(&input.title, &input.content)
                })
                .await?
            }
            PostSubmission::Edit(id, input) => {
                self.run_mutation(Mutation::EditBlogPost, || {
                    service.edit_blog_post(*id, &input.title, &input.content)
                })
                .await?
            }
        }
        self.inner.lock().await.blog.submission_succeeded();
        Ok(())
    }

    pub async fn delete_post(&self, id: BlogPostId) -> ClientResult<()> {
        self.require_admin("delete a post").await?;
        self.run_mutation(Mutation::DeleteBlogPost, || self.service.delete_blog_post(id))
            .await
    }

    // info panel

    pub async fn info_tick(&self) -> bool {
        self.inner.lock().await.info.tick()
    }

    pub async fn info_pause(&self) {
        self.inner.lock().await.info.pause();
    }

    pub async fn info_resume(&self) {
        self.inner.lock().await.info.resume();
    }

    pub async fn info_select(&self, index: usize) -> bool {
        self.inner.lock().await.info.select(index)
    }

    pub async fn info_advance(&self) -> bool {
        self.inner.lock().await.info.advance_manual()
    }

    pub async fn start_info_edit(&self) -> ClientResult<()> {
        let is_admin = self.is_caller_admin().await;
        self.inner.lock().await.info.start_legacy_edit(is_admin)
    }

    pub async fn set_info_draft(&self, content: &str) -> bool {
        self.inner.lock().await.info.set_legacy_draft(content)
    }

    pub async fn cancel_info_edit(&self) {
        self.inner.lock().await.info.finish_legacy_edit();
    }

    pub async fn save_info(&self) -> ClientResult<()> {
        let content = self.inner.lock().await.info.legacy_submission()?;
        self.run_mutation(Mutation::UpdateCaffeineInfo, || {
            self.service.update_caffeine_info(&content)
        })
        .await?;
        self.inner.lock().await.info.finish_legacy_edit();
        Ok(())
    }

    pub async fn start_managing_screens(&self) -> ClientResult<()> {
        let is_admin = self.is_caller_admin().await;
        self.inner.lock().await.info.start_managing(is_admin)
    }

    pub async fn stop_managing_screens(&self) {
        self.inner.lock().await.info.stop_managing();
    }

    /// `true` when screen changes are persisted by the service.
    async fn screens_are_remote(&self, action: &'static str) -> ClientResult<bool> {
        if !self.inner.lock().await.info.is_managing() {
            return Err(ClientError::FormBlocked {
                action,
                reason: "screen management is not open",
            });
        }
        Ok(self.capabilities().await.info_screens)
    }

    /// Screen ids are assigned by the service, so after a remote change the
    /// panel is reloaded from the service rather than patched locally.
    pub async fn set_info_section_title(&self, title: &str) -> ClientResult<String> {
        if !self.screens_are_remote("rename the section").await? {
            return self.inner.lock().await.info.set_section_title(title);
        }
        let title = validate_section_title(title)?;
        self.run_mutation(Mutation::UpdateInfoSectionTitle, || {
            self.service.update_info_section_title(&title)
        })
        .await?;
        Ok(self
            .inner
            .lock()
            .await
            .info
            .draft()
            .section_title()
            .to_string())
    }

    pub async fn add_info_screen(&self, title: &str, content: &str) -> ClientResult<InfoScreen> {
        if !self.screens_are_remote("add a screen").await? {
            return self.inner.lock().await.info.add_screen(title, content);
        }
        let (title, content) = validate_screen(title, content)?;
        self.run_mutation(Mutation::AddInfoScreen, || {
            self.service.add_info_screen(&title, &content)
        })
        .await?;
        let added = {
            let state = self.inner.lock().await;
            state
                .info
                .draft()
                .screens()
                .iter()
                .filter(|screen| screen.title == title && screen.content == content)
                .max_by_key(|screen| screen.id)
                .cloned()
        };
        added.ok_or_else(|| reload_missed(Mutation::AddInfoScreen))
    }

    pub async fn edit_info_screen(
        &self,
        id: InfoScreenId,
        title: &str,
        content: &str,
    ) -> ClientResult<InfoScreen> {
        if !self.screens_are_remote("edit a screen").await? {
            return self.inner.lock().await.info.edit_screen(id, title, content);
        }
        let (title, content) = validate_screen(title, content)?;
        self.run_mutation(Mutation::EditInfoScreen, || {
            self.service.edit_info_screen(id, &title, &content)
        })
        .await?;
        let edited = {
            let state = self.inner.lock().await;
            state
                .info
                .draft()
                .screens()
                .iter()
                .find(|screen| screen.id == id)
                .cloned()
        };
        edited.ok_or_else(|| reload_missed(Mutation::EditInfoScreen))
    }

    pub async fn delete_info_screen(&self, id: InfoScreenId) -> ClientResult<bool> {
        if !self.screens_are_remote("delete a screen").await? {
            return self.inner.lock().await.info.delete_screen(id);
        }
        self.run_mutation(Mutation::DeleteInfoScreen, || {
            self.service.delete_info_screen(id)
        })
        .await?;
        Ok(true)
    }

    // heading

    pub async fn update_heading_config(
        &self,
        text: &str,
        font_name: &str,
        color: &str,
    ) -> ClientResult<HeadingConfig> {
        if !self.capabilities().await.heading_config {
            return Err(ClientError::Unsupported("heading configuration"));
        }
        let config = validate_heading(text, HeadingFont::from_name(font_name), color)?;
        self.require_admin("edit the heading").await?;
        self.run_mutation(Mutation::UpdateHeadingConfig, || {
            self.service.update_heading_config(&config)
        })
        .await?;
        Ok(config)
    }

    // admins

    pub async fn add_admin(&self, principal_text: &str) -> ClientResult<Principal> {
        self.require_admin("add an admin").await?;
        let principal = parse_principal(principal_text)?;
        self.run_mutation(Mutation::AssignUserRole, || {
            self.service
                .assign_caller_user_role(&principal, UserRole::Admin)
        })
        .await?;
        info!(principal = %principal.short(), "admins: granted admin role");
        Ok(principal)
    }

    /// Demotes an admin to a regular user. The default admin is refused
    /// before anything is sent.
    pub async fn remove_admin(&self, principal: &Principal) -> ClientResult<()> {
        if self.gate.is_protected(principal) {
            return Err(ClientError::ProtectedAdmin(principal.clone()));
        }
        self.require_admin("remove an admin").await?;
        self.run_mutation(Mutation::AssignUserRole, || {
            self.service
                .assign_caller_user_role(principal, UserRole::User)
        })
        .await?;
        info!(principal = %principal.short(), "admins: revoked admin role");
        Ok(())
    }

    // visits

    async fn increment_visits(&self) -> ClientResult<()> {
        self.run_mutation(Mutation::IncrementVisitCount, || {
            self.service.increment_visit_count()
        })
        .await
    }

    /// Counts the first visit of this session; `Ok(false)` when already counted.
    pub async fn record_session_start(&self) -> ClientResult<bool> {
        let claimed = self
            .inner
            .lock()
            .await
            .visits
            .claim_session_visit(Instant::now());
        if !claimed {
            return Ok(false);
        }
        self.increment_visits().await?;
        Ok(true)
    }

    /// Counts a return visit when the page becomes visible after the revisit window.
    pub async fn record_visible(&self) -> ClientResult<bool> {
        let claimed = self
            .inner
            .lock()
            .await
            .visits
            .claim_return_visit(Instant::now());
        if !claimed {
            return Ok(false);
        }
        self.increment_visits().await?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
