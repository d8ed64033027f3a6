use crate::cache::{QueryCache, QueryKey};

/// Every mutation the client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    AddBlogPost,
    EditBlogPost,
    DeleteBlogPost,
    AddWebLink,
    EditWebLink,
    DeleteWebLink,
    ReorderWebLinks,
    AssignUserRole,
    UpdateCaffeineInfo,
    SaveCallerUserProfile,
    IncrementVisitCount,
    InitializeAccessControl,
    UpdateHeadingConfig,
    UpdateInfoSectionTitle,
    AddInfoScreen,
    EditInfoScreen,
    DeleteInfoScreen,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub invalidate: Vec<QueryKey>,
    /// Subset of `invalidate` fetched again right away instead of on next access.
    pub refetch: Vec<QueryKey>,
}

impl InvalidationPlan {
    fn lazy(keys: &[QueryKey]) -> Self {
        Self {
            invalidate: keys.to_vec(),
            refetch: Vec::new(),
        }
    }

    fn eager(keys: &[QueryKey]) -> Self {
        Self {
            invalidate: keys.to_vec(),
            refetch: keys.to_vec(),
        }
    }

    /// Marks every key stale and returns the ones to refetch now.
    pub fn apply(&self, cache: &mut QueryCache) -> Vec<QueryKey> {
        for key in &self.invalidate {
            cache.invalidate(*key);
        }
        self.refetch.clone()
    }
}

impl Mutation {
    pub fn name(self) -> &'static str {
        match self {
            Self::AddBlogPost => "addBlogPost",
            Self::EditBlogPost => "editBlogPost",
            Self::DeleteBlogPost => "deleteBlogPost",
            Self::AddWebLink => "addWebLink",
            Self::EditWebLink => "editWebLink",
            Self::DeleteWebLink => "deleteWebLink",
            Self::ReorderWebLinks => "reorderWebLinks",
            Self::AssignUserRole => "assignCallerUserRole",
            Self::UpdateCaffeineInfo => "updateCaffeineInfo",
            Self::SaveCallerUserProfile => "saveCallerUserProfile",
            Self::IncrementVisitCount => "incrementVisitCount",
            Self::InitializeAccessControl => "initializeAccessControl",
            Self::UpdateHeadingConfig => "updateHeadingConfig",
            Self::UpdateInfoSectionTitle => "updateCaffeineInfoSectionTitle",
            Self::AddInfoScreen => "addCaffeineInfoScreen",
            Self::EditInfoScreen => "editCaffeineInfoScreen",
            Self::DeleteInfoScreen => "deleteCaffeineInfoScreen",
        }
    }

    /// Cache keys touched once this mutation has succeeded.
    pub fn plan(self) -> InvalidationPlan {
        match self {
            Self::AddBlogPost | Self::EditBlogPost | Self::DeleteBlogPost => {
                InvalidationPlan::eager(&[QueryKey::BlogPosts])
            }
            Self::AddWebLink | Self::EditWebLink | Self::DeleteWebLink => {
                InvalidationPlan::lazy(&[QueryKey::WebLinks])
            }
            Self::ReorderWebLinks => InvalidationPlan::eager(&[QueryKey::WebLinks]),
            Self::AssignUserRole | Self::InitializeAccessControl => {
                InvalidationPlan::lazy(&[QueryKey::IsCallerAdmin, QueryKey::AdminPrincipals])
            }
            Self::UpdateCaffeineInfo => InvalidationPlan::lazy(&[QueryKey::CaffeineInfo]),
            Self::SaveCallerUserProfile => {
                InvalidationPlan::lazy(&[QueryKey::CurrentUserProfile])
            }
            Self::IncrementVisitCount => InvalidationPlan::eager(&[QueryKey::VisitCount]),
            Self::UpdateHeadingConfig => InvalidationPlan::lazy(&[QueryKey::HeadingConfig]),
            Self::UpdateInfoSectionTitle
            | Self::AddInfoScreen
            | Self::EditInfoScreen
            | Self::DeleteInfoScreen => InvalidationPlan::eager(&[QueryKey::InfoPanelConfig]),
        }
    }

    /// Only the fire-and-forget visit counter retries on its own.
    pub fn retries_automatically(self) -> bool {
        matches!(self, Self::IncrementVisitCount)
    }
}
