use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{
        BlogPost, BlogPostId, CaffeineInfo, HeadingConfig, InfoPanelConfig, InfoScreenId,
        Principal, ServiceCapabilities, UserProfile, UserRole, WebLink, WebLinkId,
    },
    error::ErrorCode,
    protocol::{ServiceCall, ServiceReply},
};

use crate::error::{ServiceError, ServiceResult};

/// Request/response boundary to the backend actor.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn call(&self, call: ServiceCall) -> ServiceResult<ServiceReply>;
}

/// Stands in while no actor has been created yet.
pub struct MissingRemoteService;

#[async_trait]
impl RemoteService for MissingRemoteService {
    async fn call(&self, _call: ServiceCall) -> ServiceResult<ServiceReply> {
        Err(ServiceError::Unavailable)
    }
}

fn unexpected(call: &'static str, reply: &ServiceReply) -> ServiceError {
    ServiceError::UnexpectedReply {
        call,
        got: reply.kind(),
    }
}

/// Typed view of [`RemoteService`].
///
/// Reads resolve to an empty/absent value while the actor is unavailable;
/// mutations are refused with [`ServiceError::Unavailable`].
#[derive(Clone)]
pub struct ServiceClient {
    remote: Arc<dyn RemoteService>,
}

impl ServiceClient {
    pub fn new(remote: Arc<dyn RemoteService>) -> Self {
        Self { remote }
    }

    async fn send(&self, call: ServiceCall) -> ServiceResult<ServiceReply> {
        match self.remote.call(call).await? {
            ServiceReply::Error(err) => Err(ServiceError::Rejected(err)),
            reply => Ok(reply),
        }
    }

    /// `Ok(None)` when the actor is unavailable.
    async fn read(&self, call: ServiceCall) -> ServiceResult<Option<ServiceReply>> {
        match self.send(call).await {
            Ok(reply) => Ok(Some(reply)),
            Err(ServiceError::Unavailable) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn mutate(&self, call: ServiceCall) -> ServiceResult<()> {
        let name = call.name();
        match self.send(call).await? {
            ServiceReply::Unit => Ok(()),
            other => Err(unexpected(name, &other)),
        }
    }

    pub async fn add_blog_post(&self, title: &str, content: &str) -> ServiceResult<()> {
        self.mutate(ServiceCall::AddBlogPost {
            title: title.into(),
            content: content.into(),
        })
        .await
    }

    pub async fn edit_blog_post(
        &self,
        id: BlogPostId,
        title: &str,
        content: &str,
    ) -> ServiceResult<()> {
        self.mutate(ServiceCall::EditBlogPost {
            id,
            title: title.into(),
            content: content.into(),
        })
        .await
    }

    pub async fn delete_blog_post(&self, id: BlogPostId) -> ServiceResult<()> {
        self.mutate(ServiceCall::DeleteBlogPost { id }).await
    }

    pub async fn get_all_blog_posts(&self) -> ServiceResult<Vec<BlogPost>> {
        match self.read(ServiceCall::GetAllBlogPosts).await? {
            None => Ok(Vec::new()),
            Some(ServiceReply::BlogPosts(posts)) => Ok(posts),
            Some(other) => Err(unexpected("getAllBlogPosts", &other)),
        }
    }

    pub async fn add_web_link(&self, title: &str, url: &str, description: &str) -> ServiceResult<()> {
        self.mutate(ServiceCall::AddWebLink {
            title: title.into(),
            url: url.into(),
            description: description.into(),
        })
        .await
    }

    pub async fn edit_web_link(
        &self,
        id: WebLinkId,
        title: &str,
        url: &str,
        description: &str,
    ) -> ServiceResult<()> {
        self.mutate(ServiceCall::EditWebLink {
            id,
            title: title.into(),
            url: url.into(),
            description: description.into(),
        })
        .await
    }

    pub async fn delete_web_link(&self, id: WebLinkId) -> ServiceResult<()> {
        self.mutate(ServiceCall::DeleteWebLink { id }).await
    }

    pub async fn get_all_web_links(&self) -> ServiceResult<Vec<WebLink>> {
        match self.read(ServiceCall::GetAllWebLinks).await? {
            None => Ok(Vec::new()),
            Some(ServiceReply::WebLinks(links)) => Ok(links),
            Some(other) => Err(unexpected("getAllWebLinks", &other)),
        }
    }

    pub async fn get_ordered_web_links(&self) -> ServiceResult<Vec<WebLink>> {
        match self.read(ServiceCall::GetOrderedWebLinks).await? {
            None => Ok(Vec::new()),
            Some(ServiceReply::WebLinks(links)) => Ok(links),
            Some(other) => Err(unexpected("getOrderedWebLinks", &other)),
        }
    }

    pub async fn reorder_web_links(&self, new_order: Vec<WebLinkId>) -> ServiceResult<()> {
        self.mutate(ServiceCall::ReorderWebLinks { new_order }).await
    }

    pub async fn get_caffeine_info(&self) -> ServiceResult<Option<CaffeineInfo>> {
        match self.read(ServiceCall::GetCaffeineInfo).await? {
            None => Ok(None),
            Some(ServiceReply::CaffeineInfo(info)) => Ok(info),
            Some(other) => Err(unexpected("getCaffeineInfo", &other)),
        }
    }

    pub async fn update_caffeine_info(&self, content: &str) -> ServiceResult<()> {
        self.mutate(ServiceCall::UpdateCaffeineInfo {
            content: content.into(),
        })
        .await
    }

    pub async fn get_caller_user_profile(&self) -> ServiceResult<Option<UserProfile>> {
        match self.read(ServiceCall::GetCallerUserProfile).await? {
            None => Ok(None),
            Some(ServiceReply::Profile(profile)) => Ok(profile),
            Some(other) => Err(unexpected("getCallerUserProfile", &other)),
        }
    }

    pub async fn get_user_profile(&self, user: &Principal) -> ServiceResult<Option<UserProfile>> {
        match self
            .read(ServiceCall::GetUserProfile { user: user.clone() })
            .await?
        {
            None => Ok(None),
            Some(ServiceReply::Profile(profile)) => Ok(profile),
            Some(other) => Err(unexpected("getUserProfile", &other)),
        }
    }

    pub async fn save_caller_user_profile(&self, profile: UserProfile) -> ServiceResult<()> {
        self.mutate(ServiceCall::SaveCallerUserProfile { profile })
            .await
    }

    pub async fn is_caller_admin(&self) -> ServiceResult<bool> {
        match self.read(ServiceCall::IsCallerAdmin).await? {
            None => Ok(false),
            Some(ServiceReply::Flag(flag)) => Ok(flag),
            Some(other) => Err(unexpected("isCallerAdmin", &other)),
        }
    }

    pub async fn get_caller_user_role(&self) -> ServiceResult<UserRole> {
        match self.read(ServiceCall::GetCallerUserRole).await? {
            None => Ok(UserRole::Guest),
            Some(ServiceReply::Role(role)) => Ok(role),
            Some(other) => Err(unexpected("getCallerUserRole", &other)),
        }
    }

    pub async fn assign_caller_user_role(
        &self,
        user: &Principal,
        role: UserRole,
    ) -> ServiceResult<()> {
        self.mutate(ServiceCall::AssignCallerUserRole {
            user: user.clone(),
            role,
        })
        .await
    }

    pub async fn get_all_admin_principals(&self) -> ServiceResult<Vec<Principal>> {
        match self.read(ServiceCall::GetAllAdminPrincipals).await? {
            None => Ok(Vec::new()),
            Some(ServiceReply::Principals(principals)) => Ok(principals),
            Some(other) => Err(unexpected("getAllAdminPrincipals", &other)),
        }
    }

    pub async fn get_visit_count(&self) -> ServiceResult<u64> {
        match self.read(ServiceCall::GetVisitCount).await? {
            None => Ok(0),
            Some(ServiceReply::Count(count)) => Ok(count),
            Some(other) => Err(unexpected("getVisitCount", &other)),
        }
    }

    pub async fn increment_visit_count(&self) -> ServiceResult<()> {
        self.mutate(ServiceCall::IncrementVisitCount).await
    }

    pub async fn initialize_access_control(&self) -> ServiceResult<()> {
        self.mutate(ServiceCall::InitializeAccessControl).await
    }

    /// Services predating capability negotiation answer `Unsupported`;
    /// they are treated as offering no optional surface.
    pub async fn capabilities(&self) -> ServiceResult<ServiceCapabilities> {
        match self.read(ServiceCall::GetCapabilities).await {
            Ok(None) => Ok(ServiceCapabilities::default()),
            Ok(Some(ServiceReply::Capabilities(caps))) => Ok(caps),
            Ok(Some(other)) => Err(unexpected("getCapabilities", &other)),
            Err(ServiceError::Rejected(err)) if err.code == ErrorCode::Unsupported => {
                Ok(ServiceCapabilities::default())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn get_heading_config(&self) -> ServiceResult<Option<HeadingConfig>> {
        match self.read(ServiceCall::GetHeadingConfig).await? {
            None => Ok(None),
            Some(ServiceReply::HeadingConfig(config)) => Ok(config),
            Some(other) => Err(unexpected("getHeadingConfig", &other)),
        }
    }

    pub async fn update_heading_config(&self, config: &HeadingConfig) -> ServiceResult<()> {
        self.mutate(ServiceCall::UpdateHeadingConfig {
            text: config.text.clone(),
            font: config.font,
            color: config.color.clone(),
        })
        .await
    }

    pub async fn get_info_panel_config(&self) -> ServiceResult<Option<InfoPanelConfig>> {
        match self.read(ServiceCall::GetInfoPanelConfig).await? {
            None => Ok(None),
            Some(ServiceReply::InfoPanelConfig(config)) => Ok(config),
            Some(other) => Err(unexpected("getCaffeineInfoConfig", &other)),
        }
    }

    pub async fn update_info_section_title(&self, title: &str) -> ServiceResult<()> {
        self.mutate(ServiceCall::UpdateInfoSectionTitle {
            title: title.into(),
        })
        .await
    }

    pub async fn add_info_screen(&self, title: &str, content: &str) -> ServiceResult<()> {
        self.mutate(ServiceCall::AddInfoScreen {
            title: title.into(),
            content: content.into(),
        })
        .await
    }

    pub async fn edit_info_screen(
        &self,
        id: InfoScreenId,
        title: &str,
        content: &str,
    ) -> ServiceResult<()> {
        self.mutate(ServiceCall::EditInfoScreen {
            id,
            title: title.into(),
            content: content.into(),
        })
        .await
    }

    pub async fn delete_info_screen(&self, id: InfoScreenId) -> ServiceResult<()> {
        self.mutate(ServiceCall::DeleteInfoScreen { id }).await
    }
}
