//! In-process [`RemoteService`] used for tests and the offline demo.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{
        BlogPost, BlogPostId, CaffeineInfo, HeadingConfig, InfoPanelConfig, InfoScreen,
        InfoScreenId, Principal, ServiceCapabilities, UserProfile, UserRole, WebLink, WebLinkId,
    },
    error::{ApiError, ErrorCode},
    protocol::{ServiceCall, ServiceReply},
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::{ServiceError, ServiceResult},
    service::RemoteService,
};

#[derive(Debug)]
struct MemoryState {
    caller: Principal,
    posts: Vec<BlogPost>,
    next_post_id: u64,
    links: Vec<WebLink>,
    order: Vec<WebLinkId>,
    next_link_id: u64,
    caffeine_info: Option<CaffeineInfo>,
    profiles: HashMap<Principal, UserProfile>,
    roles: Vec<(Principal, UserRole)>,
    visits: u64,
    capabilities: Option<ServiceCapabilities>,
    heading: Option<HeadingConfig>,
    info_panel: Option<InfoPanelConfig>,
    next_screen_id: u64,
    calls: Vec<ServiceCall>,
    failures: HashMap<&'static str, VecDeque<ServiceError>>,
}

fn forbidden(action: &str) -> ApiError {
    ApiError::new(ErrorCode::Forbidden, format!("only admins can {action}"))
}

fn unsupported(call: &ServiceCall) -> ApiError {
    ApiError::new(
        ErrorCode::Unsupported,
        format!("{} is not implemented by this service", call.name()),
    )
}

impl MemoryState {
    fn new(caller: Principal) -> Self {
        Self {
            caller,
            posts: Vec::new(),
            next_post_id: 1,
            links: Vec::new(),
            order: Vec::new(),
            next_link_id: 1,
            caffeine_info: None,
            profiles: HashMap::new(),
            roles: Vec::new(),
            visits: 0,
            capabilities: Some(ServiceCapabilities::default()),
            heading: None,
            info_panel: None,
            next_screen_id: 0,
            calls: Vec::new(),
            failures: HashMap::new(),
        }
    }

    fn role_of(&self, principal: &Principal) -> UserRole {
        self.roles
            .iter()
            .find(|(p, _)| p == principal)
            .map(|(_, role)| *role)
            .unwrap_or(UserRole::Guest)
    }

    fn set_role(&mut self, principal: Principal, role: UserRole) {
        match self.roles.iter_mut().find(|(p, _)| *p == principal) {
            Some(entry) => entry.1 = role,
            None => self.roles.push((principal, role)),
        }
    }

    fn caller_is_admin(&self) -> bool {
        self.role_of(&self.caller) == UserRole::Admin
    }

    fn require_admin(&self, action: &str) -> Result<(), ApiError> {
        if self.caller_is_admin() {
            Ok(())
        } else {
            Err(forbidden(action))
        }
    }

    fn require_capability(
        &self,
        call: &ServiceCall,
        has: impl Fn(&ServiceCapabilities) -> bool,
    ) -> Result<(), ApiError> {
        match &self.capabilities {
            Some(caps) if has(caps) => Ok(()),
            _ => Err(unsupported(call)),
        }
    }

    fn insert_link(&mut self, title: String, url: String, description: String) -> WebLinkId {
        let id = WebLinkId(self.next_link_id);
        self.next_link_id += 1;
        self.links.push(WebLink {
            id,
            url,
            title,
            description,
        });
        self.order.push(id);
        id
    }

    fn insert_post(&mut self, title: String, content: String) -> BlogPostId {
        let id = BlogPostId(self.next_post_id);
        self.next_post_id += 1;
        self.posts.push(BlogPost {
            id,
            title,
            content,
            author: self.caller.clone(),
            timestamp: Utc::now(),
        });
        id
    }

    fn ordered_links(&self) -> Vec<WebLink> {
        self.order
            .iter()
            .filter_map(|id| self.links.iter().find(|link| link.id == *id).cloned())
            .collect()
    }

    fn info_panel_mut(&mut self) -> &mut InfoPanelConfig {
        self.info_panel.get_or_insert_with(InfoPanelConfig::default)
    }

    fn take_failure(&mut self, name: &str) -> Option<ServiceError> {
        let queue = self.failures.get_mut(name)?;
        let err = queue.pop_front();
        if queue.is_empty() {
            self.failures.remove(name);
        }
        err
    }

    fn handle(&mut self, call: ServiceCall) -> Result<ServiceReply, ApiError> {
        match call {
            ServiceCall::AddBlogPost { title, content } => {
                self.require_admin("write posts")?;
                self.insert_post(title, content);
                Ok(ServiceReply::Unit)
            }
            ServiceCall::EditBlogPost { id, title, content } => {
                self.require_admin("edit posts")?;
                let post = self
                    .posts
                    .iter_mut()
                    .find(|post| post.id == id)
                    .ok_or_else(|| ApiError::not_found(format!("blog post {id}")))?;
                post.title = title;
                post.content = content;
                Ok(ServiceReply::Unit)
            }
            ServiceCall::DeleteBlogPost { id } => {
                self.require_admin("delete posts")?;
                let before = self.posts.len();
                self.posts.retain(|post| post.id != id);
                if self.posts.len() == before {
                    return Err(ApiError::not_found(format!("blog post {id}")));
                }
                Ok(ServiceReply::Unit)
            }
            ServiceCall::GetAllBlogPosts => {
                let mut posts = self.posts.clone();
                posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
                Ok(ServiceReply::BlogPosts(posts))
            }
            ServiceCall::AddWebLink {
                title,
                url,
                description,
            } => {
                self.require_admin("add links")?;
                self.insert_link(title, url, description);
                Ok(ServiceReply::Unit)
            }
            ServiceCall::EditWebLink {
                id,
                title,
                url,
                description,
            } => {
                self.require_admin("edit links")?;
                let link = self
                    .links
                    .iter_mut()
                    .find(|link| link.id == id)
                    .ok_or_else(|| ApiError::not_found(format!("web link {id}")))?;
                link.title = title;
                link.url = url;
                link.description = description;
                Ok(ServiceReply::Unit)
            }
            ServiceCall::DeleteWebLink { id } => {
                self.require_admin("delete links")?;
                let before = self.links.len();
                self.links.retain(|link| link.id != id);
                if self.links.len() == before {
                    return Err(ApiError::not_found(format!("web link {id}")));
                }
                self.order.retain(|existing| *existing != id);
                Ok(ServiceReply::Unit)
            }
            ServiceCall::GetAllWebLinks => Ok(ServiceReply::WebLinks(self.links.clone())),
            ServiceCall::GetOrderedWebLinks => Ok(ServiceReply::WebLinks(self.ordered_links())),
            ServiceCall::ReorderWebLinks { new_order } => {
                self.require_admin("reorder links")?;
                let mut submitted = new_order.clone();
                submitted.sort();
                let mut current = self.order.clone();
                current.sort();
                if submitted != current {
                    return Err(ApiError::new(
                        ErrorCode::Validation,
                        "new order must contain every link exactly once",
                    ));
                }
                self.order = new_order;
                Ok(ServiceReply::Unit)
            }
            ServiceCall::GetCaffeineInfo => {
                Ok(ServiceReply::CaffeineInfo(self.caffeine_info.clone()))
            }
            ServiceCall::UpdateCaffeineInfo { content } => {
                self.require_admin("edit the info panel")?;
                self.caffeine_info = Some(CaffeineInfo {
                    content,
                    last_updated: Utc::now(),
                });
                Ok(ServiceReply::Unit)
            }
            ServiceCall::GetCallerUserProfile => Ok(ServiceReply::Profile(
                self.profiles.get(&self.caller).cloned(),
            )),
            ServiceCall::GetUserProfile { user } => {
                if user != self.caller && !self.caller_is_admin() {
                    return Err(forbidden("read other profiles"));
                }
                Ok(ServiceReply::Profile(self.profiles.get(&user).cloned()))
            }
            ServiceCall::SaveCallerUserProfile { profile } => {
                if self.caller.is_anonymous() {
                    return Err(ApiError::unauthorized("log in to save a profile"));
                }
                let caller = self.caller.clone();
                self.profiles.insert(caller, profile);
                Ok(ServiceReply::Unit)
            }
            ServiceCall::IsCallerAdmin => Ok(ServiceReply::Flag(self.caller_is_admin())),
            ServiceCall::GetCallerUserRole => Ok(ServiceReply::Role(self.role_of(&self.caller))),
            ServiceCall::AssignCallerUserRole { user, role } => {
                self.require_admin("assign roles")?;
                self.set_role(user, role);
                Ok(ServiceReply::Unit)
            }
            ServiceCall::GetAllAdminPrincipals => {
                self.require_admin("list admins")?;
                Ok(ServiceReply::Principals(
                    self.roles
                        .iter()
                        .filter(|(_, role)| *role == UserRole::Admin)
                        .map(|(principal, _)| principal.clone())
                        .collect(),
                ))
            }
            ServiceCall::GetVisitCount => Ok(ServiceReply::Count(self.visits)),
            ServiceCall::IncrementVisitCount => {
                self.visits += 1;
                Ok(ServiceReply::Unit)
            }
            ServiceCall::InitializeAccessControl => {
                let caller = self.caller.clone();
                if caller.is_anonymous() {
                    return Ok(ServiceReply::Unit);
                }
                let has_admin = self.roles.iter().any(|(_, role)| *role == UserRole::Admin);
                if !has_admin {
                    self.set_role(caller, UserRole::Admin);
                } else if self.role_of(&caller) == UserRole::Guest {
                    self.set_role(caller, UserRole::User);
                }
                Ok(ServiceReply::Unit)
            }
            ServiceCall::GetCapabilities => match self.capabilities {
                Some(caps) => Ok(ServiceReply::Capabilities(caps)),
                None => Err(unsupported(&ServiceCall::GetCapabilities)),
            },
            ref call @ ServiceCall::GetHeadingConfig => {
                self.require_capability(call, |caps| caps.heading_config)?;
                Ok(ServiceReply::HeadingConfig(self.heading.clone()))
            }
            ref call @ ServiceCall::UpdateHeadingConfig { .. } => {
                self.require_capability(call, |caps| caps.heading_config)?;
                self.require_admin("edit the heading")?;
                if let ServiceCall::UpdateHeadingConfig { text, font, color } = call.clone() {
                    self.heading = Some(HeadingConfig { text, font, color });
                }
                Ok(ServiceReply::Unit)
            }
            ref call @ ServiceCall::GetInfoPanelConfig => {
                self.require_capability(call, |caps| caps.info_screens)?;
                Ok(ServiceReply::InfoPanelConfig(self.info_panel.clone()))
            }
            ref call @ (ServiceCall::UpdateInfoSectionTitle { .. }
            | ServiceCall::AddInfoScreen { .. }
            | ServiceCall::EditInfoScreen { .. }
            | ServiceCall::DeleteInfoScreen { .. }) => {
                self.require_capability(call, |caps| caps.info_screens)?;
                self.require_admin("manage info screens")?;
                self.apply_screen_change(call.clone())?;
                Ok(ServiceReply::Unit)
            }
        }
    }

    fn apply_screen_change(&mut self, call: ServiceCall) -> Result<(), ApiError> {
        if self.info_panel.is_none() {
            let defaults = InfoPanelConfig::default();
            self.next_screen_id = defaults.screens.len() as u64;
            self.info_panel = Some(defaults);
        }
        match call {
            ServiceCall::UpdateInfoSectionTitle { title } => {
                self.info_panel_mut().section_title = title;
            }
            ServiceCall::AddInfoScreen { title, content } => {
                let id = InfoScreenId(self.next_screen_id);
                self.next_screen_id += 1;
                self.info_panel_mut()
                    .screens
                    .push(InfoScreen { id, title, content });
            }
            ServiceCall::EditInfoScreen { id, title, content } => {
                let screen = self
                    .info_panel_mut()
                    .screens
                    .iter_mut()
                    .find(|screen| screen.id == id)
                    .ok_or_else(|| ApiError::not_found(format!("info screen {id}")))?;
                screen.title = title;
                screen.content = content;
            }
            ServiceCall::DeleteInfoScreen { id } => {
                let screens = &mut self.info_panel_mut().screens;
                let before = screens.len();
                screens.retain(|screen| screen.id != id);
                if screens.len() == before {
                    return Err(ApiError::not_found(format!("info screen {id}")));
                }
            }
            other => return Err(unsupported(&other)),
        }
        Ok(())
    }
}

/// Backend kept entirely in memory. Every call is recorded and failures can
/// be queued per remote method name.
#[derive(Debug)]
pub struct InMemoryService {
    state: Mutex<MemoryState>,
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self::new(Principal::anonymous())
    }
}

impl InMemoryService {
    pub fn new(caller: Principal) -> Self {
        Self {
            state: Mutex::new(MemoryState::new(caller)),
        }
    }

    pub fn with_admin(mut self, principal: Principal) -> Self {
        self.state.get_mut().set_role(principal, UserRole::Admin);
        self
    }

    pub fn with_role(mut self, principal: Principal, role: UserRole) -> Self {
        self.state.get_mut().set_role(principal, role);
        self
    }

    pub fn with_link(mut self, title: &str, url: &str, description: &str) -> Self {
        self.state
            .get_mut()
            .insert_link(title.into(), url.into(), description.into());
        self
    }

    pub fn with_post(mut self, title: &str, content: &str) -> Self {
        self.state.get_mut().insert_post(title.into(), content.into());
        self
    }

    pub fn with_caffeine_info(mut self, content: &str) -> Self {
        self.state.get_mut().caffeine_info = Some(CaffeineInfo {
            content: content.into(),
            last_updated: Utc::now(),
        });
        self
    }

    pub fn with_visit_count(mut self, count: u64) -> Self {
        self.state.get_mut().visits = count;
        self
    }

    /// `None` answers the capability probe as an older backend would.
    pub fn with_capabilities(mut self, capabilities: Option<ServiceCapabilities>) -> Self {
        self.state.get_mut().capabilities = capabilities;
        self
    }

    pub async fn set_caller(&self, caller: Principal) {
        self.state.lock().await.caller = caller;
    }

    /// Fails the next `times` calls of `call_name` with `err`.
    pub async fn fail_next(&self, call_name: &'static str, times: usize, err: ServiceError) {
        let mut state = self.state.lock().await;
        let queue = state.failures.entry(call_name).or_default();
        queue.extend(std::iter::repeat(err).take(times));
    }

    pub async fn calls(&self) -> Vec<ServiceCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn call_count(&self, call_name: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.name() == call_name)
            .count()
    }

    pub async fn visit_count(&self) -> u64 {
        self.state.lock().await.visits
    }

    pub async fn ordered_link_ids(&self) -> Vec<WebLinkId> {
        self.state.lock().await.order.clone()
    }
}

#[async_trait]
impl RemoteService for InMemoryService {
    async fn call(&self, call: ServiceCall) -> ServiceResult<ServiceReply> {
        let mut state = self.state.lock().await;
        state.calls.push(call.clone());

        if let Some(err) = state.take_failure(call.name()) {
            debug!(call = call.name(), error = %err, "memory: injected failure");
            return match err {
                ServiceError::Rejected(api) => Ok(ServiceReply::Error(api)),
                other => Err(other),
            };
        }

        let name = call.name();
        match state.handle(call) {
            Ok(reply) => Ok(reply),
            Err(err) => {
                debug!(call = name, code = ?err.code, "memory: call rejected");
                Ok(ServiceReply::Error(err))
            }
        }
    }
}
