use shared::domain::{BlogPost, BlogPostId};

use crate::{
    error::{ClientError, ClientResult},
    forms::{FormState, PostDraft},
    validation::{validate_post, PostInput},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostSubmission {
    Add(PostInput),
    Edit(BlogPostId, PostInput),
}

#[derive(Debug, Default)]
pub struct BlogController {
    form: FormState<BlogPostId, PostDraft>,
}

impl BlogController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self) -> &FormState<BlogPostId, PostDraft> {
        &self.form
    }

    pub fn start_add(&mut self, is_admin: bool) -> ClientResult<()> {
        if !is_admin {
            return Err(ClientError::AdminOnly("write a post"));
        }
        if self.form.is_open() {
            return Err(ClientError::FormBlocked {
                action: "write a post",
                reason: "another post form is open",
            });
        }
        self.form = FormState::Adding(PostDraft::default());
        Ok(())
    }

    pub fn start_edit(&mut self, post: &BlogPost, is_admin: bool) -> ClientResult<()> {
        if !is_admin {
            return Err(ClientError::AdminOnly("edit a post"));
        }
        if self.form.is_open() {
            return Err(ClientError::FormBlocked {
                action: "edit a post",
                reason: "another post form is open",
            });
        }
        self.form = FormState::Editing {
            id: post.id,
            draft: PostDraft::from(post),
        };
        Ok(())
    }

    pub fn set_draft(&mut self, draft: PostDraft) -> bool {
        match self.form.draft_mut() {
            Some(current) => {
                *current = draft;
                true
            }
            None => false,
        }
    }

    pub fn cancel_form(&mut self) {
        self.form.close();
    }

    pub fn submission(&self) -> ClientResult<PostSubmission> {
        match &self.form {
            FormState::Closed => Err(ClientError::FormBlocked {
                action: "submit a post",
                reason: "no post form is open",
            }),
            FormState::Adding(draft) => Ok(PostSubmission::Add(validate_post(
                &draft.title,
                &draft.content,
            )?)),
            FormState::Editing { id, draft } => Ok(PostSubmission::Edit(
                *id,
                validate_post(&draft.title, &draft.content)?,
            )),
        }
    }

    pub fn submission_succeeded(&mut self) {
        self.form.close();
    }
}
