use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        BlogPost, BlogPostId, CaffeineInfo, HeadingFont, InfoPanelConfig, InfoScreenId,
        HeadingConfig, Principal, ServiceCapabilities, UserProfile, UserRole, WebLink, WebLinkId,
    },
    error::ApiError,
};

/// One remote service operation, as posted to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServiceCall {
    AddBlogPost {
        title: String,
        content: String,
    },
    EditBlogPost {
        id: BlogPostId,
        title: String,
        content: String,
    },
    DeleteBlogPost {
        id: BlogPostId,
    },
    GetAllBlogPosts,
    AddWebLink {
        title: String,
        url: String,
        description: String,
    },
    EditWebLink {
        id: WebLinkId,
        title: String,
        url: String,
        description: String,
    },
    DeleteWebLink {
        id: WebLinkId,
    },
    GetAllWebLinks,
    GetOrderedWebLinks,
    ReorderWebLinks {
        new_order: Vec<WebLinkId>,
    },
    GetCaffeineInfo,
    UpdateCaffeineInfo {
        content: String,
    },
    GetCallerUserProfile,
    GetUserProfile {
        user: Principal,
    },
    SaveCallerUserProfile {
        profile: UserProfile,
    },
    IsCallerAdmin,
    GetCallerUserRole,
    AssignCallerUserRole {
        user: Principal,
        role: UserRole,
    },
    GetAllAdminPrincipals,
    GetVisitCount,
    IncrementVisitCount,
    InitializeAccessControl,
    GetCapabilities,
    GetHeadingConfig,
    UpdateHeadingConfig {
        text: String,
        font: HeadingFont,
        color: String,
    },
    GetInfoPanelConfig,
    UpdateInfoSectionTitle {
        title: String,
    },
    AddInfoScreen {
        title: String,
        content: String,
    },
    EditInfoScreen {
        id: InfoScreenId,
        title: String,
        content: String,
    },
    DeleteInfoScreen {
        id: InfoScreenId,
    },
}

impl ServiceCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddBlogPost { .. } => "addBlogPost",
            Self::EditBlogPost { .. } => "editBlogPost",
            Self::DeleteBlogPost { .. } => "deleteBlogPost",
            Self::GetAllBlogPosts => "getAllBlogPosts",
            Self::AddWebLink { .. } => "addWebLink",
            Self::EditWebLink { .. } => "editWebLink",
            Self::DeleteWebLink { .. } => "deleteWebLink",
            Self::GetAllWebLinks => "getAllWebLinks",
            Self::GetOrderedWebLinks => "getOrderedWebLinks",
            Self::ReorderWebLinks { .. } => "reorderWebLinks",
            Self::GetCaffeineInfo => "getCaffeineInfo",
            Self::UpdateCaffeineInfo { .. } => "updateCaffeineInfo",
            Self::GetCallerUserProfile => "getCallerUserProfile",
            Self::GetUserProfile { .. } => "getUserProfile",
            Self::SaveCallerUserProfile { .. } => "saveCallerUserProfile",
            Self::IsCallerAdmin => "isCallerAdmin",
            Self::GetCallerUserRole => "getCallerUserRole",
            Self::AssignCallerUserRole { .. } => "assignCallerUserRole",
            Self::GetAllAdminPrincipals => "getAllAdminPrincipals",
            Self::GetVisitCount => "getVisitCount",
            Self::IncrementVisitCount => "incrementVisitCount",
            Self::InitializeAccessControl => "initializeAccessControl",
            Self::GetCapabilities => "getCapabilities",
            Self::GetHeadingConfig => "getHeadingConfig",
            Self::UpdateHeadingConfig { .. } => "updateHeadingConfig",
            Self::GetInfoPanelConfig => "getCaffeineInfoConfig",
            Self::UpdateInfoSectionTitle { .. } => "updateCaffeineInfoSectionTitle",
            Self::AddInfoScreen { .. } => "addCaffeineInfoScreen",
            Self::EditInfoScreen { .. } => "editCaffeineInfoScreen",
            Self::DeleteInfoScreen { .. } => "deleteCaffeineInfoScreen",
        }
    }
}

/// Successful result of a [`ServiceCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServiceReply {
    Unit,
    BlogPosts(Vec<BlogPost>),
    WebLinks(Vec<WebLink>),
    CaffeineInfo(Option<CaffeineInfo>),
    Profile(Option<UserProfile>),
    Flag(bool),
    Role(UserRole),
    Principals(Vec<Principal>),
    Count(u64),
    Capabilities(ServiceCapabilities),
    HeadingConfig(Option<HeadingConfig>),
    InfoPanelConfig(Option<InfoPanelConfig>),
    Error(ApiError),
}

impl ServiceReply {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::BlogPosts(_) => "blog_posts",
            Self::WebLinks(_) => "web_links",
            Self::CaffeineInfo(_) => "caffeine_info",
            Self::Profile(_) => "profile",
            Self::Flag(_) => "flag",
            Self::Role(_) => "role",
            Self::Principals(_) => "principals",
            Self::Count(_) => "count",
            Self::Capabilities(_) => "capabilities",
            Self::HeadingConfig(_) => "heading_config",
            Self::InfoPanelConfig(_) => "info_panel_config",
            Self::Error(_) => "error",
        }
    }
}
