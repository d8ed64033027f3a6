use shared::domain::{BlogPost, WebLink};

/// Add/edit form of a section; at most one is open at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormState<Id, Draft> {
    #[default]
    Closed,
    Adding(Draft),
    Editing { id: Id, draft: Draft },
}

impl<Id: Copy + PartialEq, Draft> FormState<Id, Draft> {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub fn editing_id(&self) -> Option<Id> {
        match self {
            Self::Editing { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&Draft> {
        match self {
            Self::Closed => None,
            Self::Adding(draft) | Self::Editing { draft, .. } => Some(draft),
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut Draft> {
        match self {
            Self::Closed => None,
            Self::Adding(draft) | Self::Editing { draft, .. } => Some(draft),
        }
    }

    pub fn close(&mut self) {
        *self = Self::Closed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkDraft {
    pub title: String,
    pub url: String,
    pub description: String,
}

impl From<&WebLink> for LinkDraft {
    fn from(link: &WebLink) -> Self {
        Self {
            title: link.title.clone(),
            url: link.url.clone(),
            description: link.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

impl From<&BlogPost> for PostDraft {
    fn from(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
        }
    }
}
