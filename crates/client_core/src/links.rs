use shared::domain::{WebLink, WebLinkId};

use crate::{
    error::{ClientError, ClientResult, ServiceError},
    forms::{FormState, LinkDraft},
    reorder::{ReorderError, ReorderPhase, ReorderSession},
    validation::{validate_link, LinkInput},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSubmission {
    Add(LinkInput),
    Edit(WebLinkId, LinkInput),
}

/// Link section state: the add/edit form and the reorder session, which
/// exclude each other.
#[derive(Debug, Default)]
pub struct LinksController {
    form: FormState<WebLinkId, LinkDraft>,
    reorder: ReorderSession,
}

impl LinksController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self) -> &FormState<WebLinkId, LinkDraft> {
        &self.form
    }

    pub fn reorder(&self) -> &ReorderSession {
        &self.reorder
    }

    pub fn phase(&self) -> ReorderPhase {
        self.reorder.phase()
    }

    fn ensure_form_allowed(&self, action: &'static str, is_admin: bool) -> ClientResult<()> {
        if !is_admin {
            return Err(ClientError::AdminOnly(action));
        }
        if self.reorder.is_active() {
            return Err(ClientError::FormBlocked {
                action,
                reason: "links are being reordered",
            });
        }
        if self.form.is_open() {
            return Err(ClientError::FormBlocked {
                action,
                reason: "another link form is open",
            });
        }
        Ok(())
    }

    pub fn start_add(&mut self, is_admin: bool) -> ClientResult<()> {
        self.ensure_form_allowed("add a link", is_admin)?;
        self.form = FormState::Adding(LinkDraft::default());
        Ok(())
    }

    pub fn start_edit(&mut self, link: &WebLink, is_admin: bool) -> ClientResult<()> {
        self.ensure_form_allowed("edit a link", is_admin)?;
        self.form = FormState::Editing {
            id: link.id,
            draft: LinkDraft::from(link),
        };
        Ok(())
    }

    /// Replaces the open draft; `false` when no form is open.
    pub fn set_draft(&mut self, draft: LinkDraft) -> bool {
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

    /// Validated request for the open form; the form stays open until
    /// [`Self::submission_succeeded`].
    pub fn submission(&self) -> ClientResult<LinkSubmission> {
        let (id, draft) = match &self.form {
            FormState::Closed => {
                return Err(ClientError::FormBlocked {
                    action: "submit a link",
                    reason: "no link form is open",
                })
            }
            FormState::Adding(draft) => (None, draft),
            FormState::Editing { id, draft } => (Some(*id), draft),
        };
        let input = validate_link(&draft.title, &draft.url, &draft.description)?;
        Ok(match id {
            Some(id) => LinkSubmission::Edit(id, input),
            None => LinkSubmission::Add(input),
        })
    }

    pub fn submission_succeeded(&mut self) {
        self.form.close();
    }

    pub fn can_delete(&self, is_admin: bool) -> bool {
        is_admin && !self.reorder.is_active()
    }

    pub fn enter_reordering(&mut self, links: &[WebLink], is_admin: bool) -> Result<(), ReorderError> {
        self.reorder.enter(links, is_admin, self.form.is_open())
    }

    pub fn drag_start(&mut self, id: WebLinkId) -> Result<bool, ReorderError> {
        self.reorder.drag_start(id, self.form.editing_id().is_some())
    }

    pub fn drag_over(&mut self, target_index: usize) -> Result<bool, ReorderError> {
        self.reorder.drag_over(target_index)
    }

    pub fn drop_at(&mut self, target_index: usize) -> Result<(), ReorderError> {
        self.reorder.drop_at(target_index)
    }

    pub fn drag_end(&mut self) {
        self.reorder.drag_end();
    }

    pub fn begin_save(&mut self) -> Result<Vec<WebLinkId>, ReorderError> {
        self.reorder.begin_save()
    }

    pub fn save_succeeded(&mut self) -> Result<Vec<WebLink>, ReorderError> {
        self.reorder.save_succeeded()
    }

    pub fn save_failed(&mut self, err: &ServiceError) -> Result<(), ReorderError> {
        self.reorder.save_failed(err)
    }

    pub fn cancel_reordering(&mut self) -> Result<Vec<WebLink>, ReorderError> {
        self.reorder.cancel()
    }
}
