//! The rotating informational panel.
//!
//! When the service has a legacy singleton record the panel shows it as-is.
//! Otherwise it rotates through a set of screens held in an
//! [`InfoPanelDraft`]. The draft is client-only unless the service
//! advertises the `info_screens` capability, in which case every change is
//! also sent to the service.

use shared::domain::{CaffeineInfo, InfoPanelConfig, InfoScreen, InfoScreenId};

use crate::{
    error::{ClientError, ClientResult},
    validation::{validate_info_content, validate_screen, validate_section_title},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoPanelDraft {
    config: InfoPanelConfig,
    next_id: u64,
}

impl InfoPanelDraft {
    pub fn from_config(config: InfoPanelConfig) -> Self {
        let next_id = config
            .screens
            .iter()
            .map(|screen| screen.id.0 + 1)
            .max()
            .unwrap_or(0);
        Self { config, next_id }
    }

    pub fn config(&self) -> &InfoPanelConfig {
        &self.config
    }

    pub fn screens(&self) -> &[InfoScreen] {
        &self.config.screens
    }

    pub fn section_title(&self) -> &str {
        &self.config.section_title
    }

    fn set_section_title(&mut self, title: String) {
        self.config.section_title = title;
    }

    fn add_screen(&mut self, title: String, content: String) -> InfoScreenId {
        let id = InfoScreenId(self.next_id);
        self.next_id += 1;
        self.config.screens.push(InfoScreen { id, title, content });
        id
    }

    fn edit_screen(&mut self, id: InfoScreenId, title: String, content: String) -> bool {
        match self.config.screens.iter_mut().find(|screen| screen.id == id) {
            Some(screen) => {
                screen.title = title;
                screen.content = content;
                true
            }
            None => false,
        }
    }

    fn delete_screen(&mut self, id: InfoScreenId) -> bool {
        let before = self.config.screens.len();
        self.config.screens.retain(|screen| screen.id != id);
        self.config.screens.len() != before
    }
}

impl Default for InfoPanelDraft {
    fn default() -> Self {
        Self::from_config(InfoPanelConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoView<'a> {
    Legacy(&'a CaffeineInfo),
    Screen {
        section_title: &'a str,
        screen: &'a InfoScreen,
        index: usize,
        total: usize,
    },
    Empty,
}

#[derive(Debug, Default)]
pub struct InfoPanel {
    legacy: Option<CaffeineInfo>,
    draft: InfoPanelDraft,
    current: usize,
    paused: bool,
    legacy_edit: Option<String>,
    managing: bool,
}

impl InfoPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_legacy(&mut self, info: Option<CaffeineInfo>) {
        self.legacy = info;
    }

    pub fn is_legacy_mode(&self) -> bool {
        self.legacy.is_some()
    }

    /// Replaces the screens with the service's copy; the rotation index is
    /// clamped to the new length.
    pub fn load_remote(&mut self, config: InfoPanelConfig) {
        self.draft = InfoPanelDraft::from_config(config);
        self.clamp_current();
    }

    pub fn draft(&self) -> &InfoPanelDraft {
        &self.draft
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_managing(&self) -> bool {
        self.managing
    }

    pub fn is_editing_legacy(&self) -> bool {
        self.legacy_edit.is_some()
    }

    fn rotation_frozen(&self) -> bool {
        self.is_legacy_mode() || self.is_editing_legacy() || self.managing
    }

    fn clamp_current(&mut self) {
        let len = self.draft.screens().len();
        if len == 0 {
            self.current = 0;
        } else if self.current >= len {
            self.current = len - 1;
        }
    }

    pub fn view(&self) -> InfoView<'_> {
        if let Some(info) = &self.legacy {
            return InfoView::Legacy(info);
        }
        match self.draft.screens().get(self.current) {
            Some(screen) => InfoView::Screen {
                section_title: self.draft.section_title(),
                screen,
                index: self.current,
                total: self.draft.screens().len(),
            },
            None => InfoView::Empty,
        }
    }

    /// Timer tick; advances unless paused or frozen. Returns whether it moved.
    pub fn tick(&mut self) -> bool {
        let len = self.draft.screens().len();
        if self.paused || self.rotation_frozen() || len == 0 {
            return false;
        }
        self.current = (self.current + 1) % len;
        true
    }

    pub fn pause(&mut self) {
        if !self.rotation_frozen() {
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Jumps to a screen and pauses rotation there.
    pub fn select(&mut self, index: usize) -> bool {
        if self.rotation_frozen() || index >= self.draft.screens().len() {
            return false;
        }
        self.paused = true;
        self.current = index;
        true
    }

    /// Manual step, only while paused.
    pub fn advance_manual(&mut self) -> bool {
        let len = self.draft.screens().len();
        if !self.paused || self.rotation_frozen() || len == 0 {
            return false;
        }
        self.current = (self.current + 1) % len;
        true
    }

    pub fn start_legacy_edit(&mut self, is_admin: bool) -> ClientResult<()> {
        if !is_admin {
            return Err(ClientError::AdminOnly("edit the info panel"));
        }
        let content = self
            .legacy
            .as_ref()
            .map(|info| info.content.clone())
            .unwrap_or_default();
        self.legacy_edit = Some(content);
        Ok(())
    }

    pub fn set_legacy_draft(&mut self, content: impl Into<String>) -> bool {
        match self.legacy_edit.as_mut() {
            Some(draft) => {
                *draft = content.into();
                true
            }
            None => false,
        }
    }

    pub fn legacy_submission(&self) -> ClientResult<String> {
        match &self.legacy_edit {
            Some(draft) => Ok(validate_info_content(draft)?),
            None => Err(ClientError::FormBlocked {
                action: "save the info panel",
                reason: "the info editor is not open",
            }),
        }
    }

    pub fn finish_legacy_edit(&mut self) {
        self.legacy_edit = None;
    }

    pub fn start_managing(&mut self, is_admin: bool) -> ClientResult<()> {
        if !is_admin {
            return Err(ClientError::AdminOnly("manage info screens"));
        }
        self.managing = true;
        Ok(())
    }

    pub fn stop_managing(&mut self) {
        self.managing = false;
    }

    fn ensure_managing(&self, action: &'static str) -> ClientResult<()> {
        if self.managing {
            Ok(())
        } else {
            Err(ClientError::FormBlocked {
                action,
                reason: "screen management is not open",
            })
        }
    }

    pub fn set_section_title(&mut self, title: &str) -> ClientResult<String> {
        self.ensure_managing("rename the section")?;
        let title = validate_section_title(title)?;
        self.draft.set_section_title(title.clone());
        Ok(title)
    }

    pub fn add_screen(&mut self, title: &str, content: &str) -> ClientResult<InfoScreen> {
        self.ensure_managing("add a screen")?;
        let (title, content) = validate_screen(title, content)?;
        let id = self.draft.add_screen(title.clone(), content.clone());
        Ok(InfoScreen { id, title, content })
    }

    pub fn edit_screen(
        &mut self,
        id: InfoScreenId,
        title: &str,
        content: &str,
    ) -> ClientResult<InfoScreen> {
        self.ensure_managing("edit a screen")?;
        let (title, content) = validate_screen(title, content)?;
        if !self.draft.edit_screen(id, title.clone(), content.clone()) {
            return Err(ClientError::FormBlocked {
                action: "edit a screen",
                reason: "no such screen",
            });
        }
        Ok(InfoScreen { id, title, content })
    }

    pub fn delete_screen(&mut self, id: InfoScreenId) -> ClientResult<bool> {
        self.ensure_managing("delete a screen")?;
        let removed = self.draft.delete_screen(id);
        self.clamp_current();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn screen_titles(panel: &InfoPanel) -> Vec<String> {
        panel
            .draft()
            .screens()
            .iter()
            .map(|screen| screen.title.clone())
            .collect()
    }

    #[test]
    fn rotates_through_default_screens() {
        let mut panel = InfoPanel::new();
        assert_eq!(panel.draft().screens().len(), 5);
        for expected in [1, 2, 3, 4, 0] {
            assert!(panel.tick());
            assert_eq!(panel.current_index(), expected);
        }
    }

    #[test]
    fn pause_stops_timer_but_allows_manual_steps() {
        let mut panel = InfoPanel::new();
        assert!(!panel.advance_manual(), "manual step needs a pause");
        panel.pause();
        assert!(!panel.tick());
        assert!(panel.advance_manual());
        assert_eq!(panel.current_index(), 1);

        assert!(panel.select(4));
        assert_eq!(panel.current_index(), 4);
        assert!(panel.advance_manual());
        assert_eq!(panel.current_index(), 0);
    }

    #[test]
    fn legacy_record_freezes_rotation() {
        let mut panel = InfoPanel::new();
        panel.set_legacy(Some(CaffeineInfo {
            content: "hello".into(),
            last_updated: Utc::now(),
        }));
        assert!(!panel.tick());
        assert!(!panel.select(2));
        assert!(matches!(panel.view(), InfoView::Legacy(info) if info.content == "hello"));
    }

    #[test]
    fn managing_edits_draft_and_clamps_index() {
        let mut panel = InfoPanel::new();
        assert!(panel.add_screen("x", "y").is_err(), "management closed");
        panel.start_managing(true).expect("manage");

        let added = panel.add_screen(" New ", " Body ").expect("add");
        assert_eq!(added.id, InfoScreenId(5));
        assert_eq!(added.title, "New");

        panel
            .edit_screen(InfoScreenId(0), "First", "Edited")
            .expect("edit");
        assert_eq!(screen_titles(&panel)[0], "First");

        panel.stop_managing();
        panel.select(5);
        panel.start_managing(true).expect("manage");
        assert!(panel.delete_screen(InfoScreenId(5)).expect("delete"));
        assert_eq!(panel.current_index(), 4);
        assert!(!panel.delete_screen(InfoScreenId(42)).expect("missing"));
    }

    #[test]
    fn deleting_every_screen_leaves_an_empty_view() {
        let mut panel = InfoPanel::new();
        panel.start_managing(true).expect("manage");
        for id in 0..5 {
            panel.delete_screen(InfoScreenId(id)).expect("delete");
        }
        panel.stop_managing();
        assert_eq!(panel.view(), InfoView::Empty);
        assert!(!panel.tick());
    }

    #[test]
    fn legacy_edit_requires_content() {
        let mut panel = InfoPanel::new();
        assert!(panel.start_legacy_edit(false).is_err());
        panel.start_legacy_edit(true).expect("edit");
        panel.set_legacy_draft("   ");
        assert!(panel.legacy_submission().is_err());
        panel.set_legacy_draft(" fresh ");
        assert_eq!(panel.legacy_submission().expect("valid"), "fresh");
    }

    #[test]
    fn remote_config_replaces_draft() {
        let mut panel = InfoPanel::new();
        panel.select(4);
        panel.load_remote(InfoPanelConfig {
            section_title: "Remote".into(),
            screens: vec![InfoScreen {
                id: InfoScreenId(10),
                title: "Only".into(),
                content: "one".into(),
            }],
        });
        assert_eq!(panel.current_index(), 0);
        assert_eq!(panel.draft().section_title(), "Remote");
        panel.start_managing(true).expect("manage");
        assert_eq!(panel.add_screen("b", "c").expect("add").id, InfoScreenId(11));
    }
}
