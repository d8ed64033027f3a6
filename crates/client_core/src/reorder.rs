//! Drag-and-drop reordering of the link directory.
//!
//! A session keeps two copies of the server-confirmed order: `original`,
//! which `cancel` restores, and `working`, which drag gestures permute in
//! place so the new order can be previewed before it is committed with a
//! single reorder request.

use shared::domain::{WebLink, WebLinkId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderPhase {
    Idle,
    Reordering,
    Dragging,
    Saving,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReorderError {
    #[error("reordering requires the admin role")]
    NotAdmin,
    #[error("reordering needs more than one link, have {count}")]
    TooFewLinks { count: usize },
    #[error("close the open link form before reordering")]
    EditInProgress,
    #[error("cannot {action} while {phase:?}")]
    InvalidPhase {
        action: &'static str,
        phase: ReorderPhase,
    },
    #[error("link {0} is not in the working order")]
    UnknownLink(WebLinkId),
    #[error("target index {index} is out of range for {len} links")]
    IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone)]
struct ActiveSession {
    original: Vec<WebLink>,
    working: Vec<WebLink>,
    grabbed: Option<WebLinkId>,
    hover_index: Option<usize>,
    saving: bool,
    last_error: Option<ServiceError>,
}

#[derive(Debug, Clone, Default)]
pub struct ReorderSession {
    active: Option<ActiveSession>,
}

impl ReorderSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ReorderPhase {
        match &self.active {
            None => ReorderPhase::Idle,
            Some(session) if session.saving => ReorderPhase::Saving,
            Some(session) if session.grabbed.is_some() => ReorderPhase::Dragging,
            Some(_) => ReorderPhase::Reordering,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn original(&self) -> Option<&[WebLink]> {
        self.active.as_ref().map(|s| s.original.as_slice())
    }

    pub fn working(&self) -> Option<&[WebLink]> {
        self.active.as_ref().map(|s| s.working.as_slice())
    }

    pub fn working_ids(&self) -> Vec<WebLinkId> {
        self.working()
            .map(|links| links.iter().map(|link| link.id).collect())
            .unwrap_or_default()
    }

    pub fn grabbed(&self) -> Option<WebLinkId> {
        self.active.as_ref().and_then(|s| s.grabbed)
    }

    pub fn hover_index(&self) -> Option<usize> {
        self.active.as_ref().and_then(|s| s.hover_index)
    }

    /// Error of the last failed save, cleared by the next attempt.
    pub fn last_error(&self) -> Option<&ServiceError> {
        self.active.as_ref().and_then(|s| s.last_error.as_ref())
    }

    /// The working copy during a session, otherwise the server order.
    pub fn display_order<'a>(&'a self, server: &'a [WebLink]) -> &'a [WebLink] {
        self.working().unwrap_or(server)
    }

    pub fn is_draggable(&self, id: WebLinkId, editing: Option<WebLinkId>) -> bool {
        matches!(
            self.phase(),
            ReorderPhase::Reordering | ReorderPhase::Dragging
        ) && editing != Some(id)
    }

    fn active_mut(&mut self, action: &'static str) -> Result<&mut ActiveSession, ReorderError> {
        let phase = self.phase();
        self.active
            .as_mut()
            .ok_or(ReorderError::InvalidPhase { action, phase })
    }

    pub fn enter(
        &mut self,
        links: &[WebLink],
        is_admin: bool,
        edit_open: bool,
    ) -> Result<(), ReorderError> {
        if self.active.is_some() {
            return Err(ReorderError::InvalidPhase {
                action: "start reordering",
                phase: self.phase(),
            });
        }
        if !is_admin {
            return Err(ReorderError::NotAdmin);
        }
        if edit_open {
            return Err(ReorderError::EditInProgress);
        }
        if links.len() <= 1 {
            return Err(ReorderError::TooFewLinks { count: links.len() });
        }

        info!(link_count = links.len(), "reorder: session started");
        self.active = Some(ActiveSession {
            original: links.to_vec(),
            working: links.to_vec(),
            grabbed: None,
            hover_index: None,
            saving: false,
            last_error: None,
        });
        Ok(())
    }

    /// Returns `false` when the grab is ignored (edit open or save pending).
    pub fn drag_start(&mut self, id: WebLinkId, edit_open: bool) -> Result<bool, ReorderError> {
        let session = self.active_mut("start dragging")?;
        if session.saving || edit_open {
            return Ok(false);
        }
        if !session.working.iter().any(|link| link.id == id) {
            return Err(ReorderError::UnknownLink(id));
        }

        session.grabbed = Some(id);
        session.hover_index = None;
        Ok(true)
    }

    /// Moves the grabbed link to `target_index` in the working copy.
    ///
    /// Returns `true` when the working order changed. Hovering the same
    /// index again, or an index the link already occupies, is a no-op.
    pub fn drag_over(&mut self, target_index: usize) -> Result<bool, ReorderError> {
        let session = self.active_mut("drag")?;
        let Some(grabbed) = session.grabbed else {
            return Ok(false);
        };
        if session.saving {
            return Ok(false);
        }
        let len = session.working.len();
        if target_index >= len {
            return Err(ReorderError::IndexOutOfRange {
                index: target_index,
                len,
            });
        }
        if session.hover_index == Some(target_index) {
            return Ok(false);
        }
        session.hover_index = Some(target_index);

        let Some(from) = session.working.iter().position(|link| link.id == grabbed) else {
            return Err(ReorderError::UnknownLink(grabbed));
        };
        if from == target_index {
            return Ok(false);
        }

        let moved = session.working.remove(from);
        session.working.insert(target_index, moved);
        debug!(
            link_id = grabbed.0,
            from,
            to = target_index,
            "reorder: preview updated"
        );
        Ok(true)
    }

    /// Ends the gesture; the permutation was already applied by `drag_over`.
    pub fn drop_at(&mut self, target_index: usize) -> Result<(), ReorderError> {
        let session = self.active_mut("drop")?;
        if let Some(grabbed) = session.grabbed.take() {
            debug!(link_id = grabbed.0, target_index, "reorder: dropped");
        }
        session.hover_index = None;
        Ok(())
    }

    /// Gesture abandoned outside any target.
    pub fn drag_end(&mut self) {
        if let Some(session) = self.active.as_mut() {
            session.grabbed = None;
            session.hover_index = None;
        }
    }

    /// Enters `Saving` and returns the order to submit.
    pub fn begin_save(&mut self) -> Result<Vec<WebLinkId>, ReorderError> {
        let phase = self.phase();
        if phase != ReorderPhase::Reordering {
            return Err(ReorderError::InvalidPhase {
                action: "save",
                phase,
            });
        }
        let session = self.active_mut("save")?;
        session.saving = true;
        session.last_error = None;
        Ok(session.working.iter().map(|link| link.id).collect())
    }

    /// Ends the session; returns the order that is now persisted.
    pub fn save_succeeded(&mut self) -> Result<Vec<WebLink>, ReorderError> {
        let phase = self.phase();
        if phase != ReorderPhase::Saving {
            return Err(ReorderError::InvalidPhase {
                action: "complete save",
                phase,
            });
        }
        let saved = self.active.take().map(|s| s.working).unwrap_or_default();
        info!(link_count = saved.len(), "reorder: order saved");
        Ok(saved)
    }

    /// Back to `Reordering` with the working copy kept for a retry.
    pub fn save_failed(&mut self, err: &ServiceError) -> Result<(), ReorderError> {
        let phase = self.phase();
        if phase != ReorderPhase::Saving {
            return Err(ReorderError::InvalidPhase {
                action: "fail save",
                phase,
            });
        }
        let session = self.active_mut("fail save")?;
        session.saving = false;
        session.last_error = Some(err.clone());
        warn!(error = %err, "reorder: save failed, keeping working order");
        Ok(())
    }

    /// Drops the working copy and returns the original order.
    pub fn cancel(&mut self) -> Result<Vec<WebLink>, ReorderError> {
        let phase = self.phase();
        if matches!(phase, ReorderPhase::Idle | ReorderPhase::Saving) {
            return Err(ReorderError::InvalidPhase {
                action: "cancel",
                phase,
            });
        }
        let original = self.active.take().map(|s| s.original).unwrap_or_default();
        info!("reorder: session cancelled");
        Ok(original)
    }
}

#[cfg(test)]
#[path = "tests/reorder_tests.rs"]
mod tests;
