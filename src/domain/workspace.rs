//! Client registry plus the editing session for the active client.
//!
//! Owns the persisted [`RootState`] and saves it after every client change
//! and every commit. Anything that moves the active client away from an open
//! session goes through the session's navigation guard first.

use crate::domain::backup;
use crate::domain::calculation::{self, CalcInputs, CalcResult};
use crate::domain::error::RatesheetError;
use crate::domain::model_key::ModelKey;
use crate::domain::rate_table::{generate_id, Client, RootState};
use crate::domain::session::{DraftSession, Navigation};
use crate::domain::tariff::Tariff;
use crate::ports::confirm_port::ConfirmPort;
use crate::ports::persistence_port::PersistencePort;
use log::{info, warn};

pub const DEFAULT_CLIENT_NAME: &str = "Default Client";

pub struct Workspace<P: PersistencePort> {
    state: RootState,
    persistence: P,
    session: Option<DraftSession>,
}

impl<P: PersistencePort> Workspace<P> {
    /// Loads saved state, creating a default client on first run.
    pub fn open(persistence: P) -> Result<Self, RatesheetError> {
        let loaded = persistence.load()?;
        let fresh = loaded.is_none();
        let mut state = loaded.unwrap_or_default();
        state.check_alignment()?;

        let mut repaired = false;
        if state.clients.is_empty() {
            let client = Client::new(DEFAULT_CLIENT_NAME);
            info!("creating default client {}", client.id);
            state.clients.insert(client.id.clone(), client);
            repaired = true;
        }
        if state.active_client().is_none() {
            state.active_client_id = state.clients.keys().next().cloned();
            repaired = true;
        }
        for client in state.clients.values_mut() {
            if client.store.repair_active_profiles() {
                warn!("client {} had tables with no active table", client.id);
                repaired = true;
            }
        }

        let workspace = Self {
            state,
            persistence,
            session: None,
        };
        if fresh || repaired {
            workspace.persistence.save(&workspace.state)?;
        }
        Ok(workspace)
    }

    pub fn state(&self) -> &RootState {
        &self.state
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn active_client(&self) -> Option<&Client> {
        self.state.active_client()
    }

    pub fn client(&self, id: &str) -> Result<&Client, RatesheetError> {
        self.state
            .clients
            .get(id)
            .ok_or_else(|| RatesheetError::UnknownClient { id: id.to_string() })
    }

    pub fn session(&self) -> Option<&DraftSession> {
        self.session.as_ref()
    }

    /// Opens (or returns the already open) draft for the active client.
    pub fn begin_edit(&mut self) -> Result<&mut DraftSession, RatesheetError> {
        let active = self
            .state
            .active_client_id
            .clone()
            .ok_or_else(|| RatesheetError::UnknownClient { id: String::new() })?;
        let reusable = self
            .session
            .as_ref()
            .is_some_and(|s| s.is_open() && s.client_id() == active);
        if !reusable {
            let client = self.client(&active)?;
            self.session = Some(DraftSession::load(client));
        }
        self.session.as_mut().ok_or(RatesheetError::SessionClosed)
    }

    pub fn commit(&mut self) -> Result<(), RatesheetError> {
        let session = self.session.as_mut().ok_or(RatesheetError::SessionClosed)?;
        session.commit(&mut self.state, &self.persistence)
    }

    /// Closes the open session, asking first when it has unsaved changes.
    pub fn close_session(&mut self, confirm: &dyn ConfirmPort) -> Result<(), RatesheetError> {
        if let Some(session) = self.session.as_mut() {
            if session.leave(confirm) == Navigation::Cancelled {
                return Err(RatesheetError::NavigationCancelled);
            }
        }
        self.session = None;
        Ok(())
    }

    /// Prices against the saved tables of the active client.
    pub fn calculate(
        &self,
        model: ModelKey,
        inputs: &CalcInputs,
        tariff: &Tariff,
    ) -> Result<CalcResult, RatesheetError> {
        let client = self
            .active_client()
            .ok_or_else(|| RatesheetError::UnknownClient { id: String::new() })?;
        let profile = client
            .store
            .active_profile(model)
            .ok_or(RatesheetError::NoActiveProfile { model })?;
        Ok(calculation::calculate(profile, model, inputs, tariff))
    }

    /// Applies a change to the root state and saves it; a failed save
    /// restores the previous state.
    fn update<T>(
        &mut self,
        change: impl FnOnce(&mut RootState) -> Result<T, RatesheetError>,
    ) -> Result<T, RatesheetError> {
        let snapshot = self.state.clone();
        let result = change(&mut self.state).and_then(|value| {
            self.persistence.save(&self.state)?;
            Ok(value)
        });
        if result.is_err() {
            self.state = snapshot;
        }
        result
    }

    pub fn switch_client(&mut self, id: &str, confirm: &dyn ConfirmPort) -> Result<(), RatesheetError> {
        self.client(id)?;
        if self.state.active_client_id.as_deref() == Some(id) {
            return Ok(());
        }
        self.close_session(confirm)?;
        self.update(|state| {
            state.active_client_id = Some(id.to_string());
            Ok(())
        })?;
        info!("switched to client {}", id);
        Ok(())
    }

    pub fn add_client(&mut self, name: &str, confirm: &dyn ConfirmPort) -> Result<String, RatesheetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RatesheetError::EmptyClientName);
        }
        self.close_session(confirm)?;
        let client = Client::new(name);
        let id = client.id.clone();
        self.update(|state| {
            state.clients.insert(client.id.clone(), client);
            state.active_client_id = Some(id.clone());
            Ok(())
        })?;
        info!("added client {} ({})", name, id);
        Ok(id)
    }

    pub fn rename_client(&mut self, id: &str, name: &str) -> Result<(), RatesheetError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RatesheetError::EmptyClientName);
        }
        self.update(|state| {
            let client = state
                .clients
                .get_mut(id)
                .ok_or_else(|| RatesheetError::UnknownClient { id: id.to_string() })?;
            client.name = name.to_string();
            Ok(())
        })
    }

    pub fn set_description(&mut self, id: &str, description: &str) -> Result<(), RatesheetError> {
        self.update(|state| {
            let client = state
                .clients
                .get_mut(id)
                .ok_or_else(|| RatesheetError::UnknownClient { id: id.to_string() })?;
            client.description = description.to_string();
            Ok(())
        })
    }

    /// Removes a client. The last client cannot be removed; deleting the
    /// active one makes the first remaining client active.
    pub fn delete_client(&mut self, id: &str, confirm: &dyn ConfirmPort) -> Result<(), RatesheetError> {
        self.client(id)?;
        if self.state.clients.len() <= 1 {
            return Err(RatesheetError::LastClient);
        }
        if self.session.as_ref().is_some_and(|s| s.client_id() == id) {
            self.close_session(confirm)?;
        }
        self.update(|state| {
            state.clients.remove(id);
            if state.active_client_id.as_deref() == Some(id) {
                state.active_client_id = state.clients.keys().next().cloned();
            }
            Ok(())
        })?;
        warn!("deleted client {}", id);
        Ok(())
    }

    pub fn backup_client(&self, id: &str) -> Result<String, RatesheetError> {
        Ok(backup::to_json(self.client(id)?)?)
    }

    /// Restores a backup as a new client under a fresh id and makes it
    /// active. Returns `None` when the operator declines.
    pub fn restore_backup(
        &mut self,
        json: &str,
        confirm: &dyn ConfirmPort,
    ) -> Result<Option<String>, RatesheetError> {
        let mut client = backup::parse(json)?;
        let question = format!(
            "Restore data for \"{}\"? This will create a NEW client entry.",
            client.name
        );
        if !confirm.confirm(&question) {
            return Ok(None);
        }
        self.close_session(confirm)?;

        client.id = generate_id("c_");
        let id = client.id.clone();
        self.update(|state| {
            state.clients.insert(client.id.clone(), client);
            state.active_client_id = Some(id.clone());
            Ok(())
        })?;
        info!("restored backup as client {}", id);
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::editor;
    use crate::domain::session::SessionState;
    use crate::ports::confirm_port::FixedAnswer;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct MemoryStore {
        saved: RefCell<Option<RootState>>,
        saves: Cell<usize>,
    }

    impl PersistencePort for MemoryStore {
        fn load(&self) -> Result<Option<RootState>, RatesheetError> {
            Ok(self.saved.borrow().clone())
        }

        fn save(&self, state: &RootState) -> Result<(), RatesheetError> {
            self.saves.set(self.saves.get() + 1);
            *self.saved.borrow_mut() = Some(state.clone());
            Ok(())
        }
    }

    fn open() -> Workspace<MemoryStore> {
        Workspace::open(MemoryStore::default()).unwrap()
    }

    #[test]
    fn first_open_creates_default_client() {
        let ws = open();
        assert_eq!(ws.state().clients.len(), 1);
        assert_eq!(ws.active_client().unwrap().name, DEFAULT_CLIENT_NAME);
        assert_eq!(ws.persistence().saves.get(), 1);
    }

    #[test]
    fn reopen_keeps_saved_state() {
        let ws = open();
        let saved = ws.state().clone();
        let store = MemoryStore::default();
        *store.saved.borrow_mut() = Some(saved.clone());
        let ws = Workspace::open(store).unwrap();
        assert_eq!(ws.state(), &saved);
        assert_eq!(ws.persistence().saves.get(), 0);
    }

    #[test]
    fn open_selects_a_table_where_none_is_active() {
        let mut saved = open().state().clone();
        for client in saved.clients.values_mut() {
            client.store.bucket_mut(ModelKey::MinCumulative).active_profile_id = None;
        }
        let store = MemoryStore::default();
        *store.saved.borrow_mut() = Some(saved);

        let ws = Workspace::open(store).unwrap();
        let client = ws.active_client().unwrap();
        assert!(client.store.active_profile(ModelKey::MinCumulative).is_some());
        assert_eq!(ws.persistence().saves.get(), 1);
        let persisted = ws.persistence().saved.borrow().clone().unwrap();
        assert_eq!(&persisted, ws.state());
    }

    #[test]
    fn add_client_becomes_active() {
        let mut ws = open();
        let id = ws.add_client("Acme", &FixedAnswer(true)).unwrap();
        assert_eq!(ws.active_client().unwrap().id, id);
        assert!(matches!(
            ws.add_client("  ", &FixedAnswer(true)),
            Err(RatesheetError::EmptyClientName)
        ));
    }

    #[test]
    fn last_client_cannot_be_deleted() {
        let mut ws = open();
        let id = ws.active_client().unwrap().id.clone();
        assert!(matches!(
            ws.delete_client(&id, &FixedAnswer(true)),
            Err(RatesheetError::LastClient)
        ));
    }

    #[test]
    fn deleting_active_client_moves_to_remaining() {
        let mut ws = open();
        let first = ws.active_client().unwrap().id.clone();
        let second = ws.add_client("Acme", &FixedAnswer(true)).unwrap();
        ws.delete_client(&second, &FixedAnswer(true)).unwrap();
        assert_eq!(ws.active_client().unwrap().id, first);
    }

    #[test]
    fn rename_and_describe_are_saved() {
        let mut ws = open();
        let id = ws.active_client().unwrap().id.clone();
        ws.rename_client(&id, "Renamed").unwrap();
        ws.set_description(&id, "Main account").unwrap();
        let saved = ws.persistence().saved.borrow().clone().unwrap();
        assert_eq!(saved.clients[&id].name, "Renamed");
        assert_eq!(saved.clients[&id].description, "Main account");
        assert!(ws.rename_client("c_missing", "X").is_err());
    }

    #[test]
    fn switching_with_dirty_draft_is_guarded() {
        let mut ws = open();
        let first = ws.active_client().unwrap().id.clone();
        let second = ws.add_client("Acme", &FixedAnswer(true)).unwrap();
        ws.switch_client(&first, &FixedAnswer(true)).unwrap();

        ws.begin_edit()
            .unwrap()
            .edit_profile(ModelKey::Fixed, |p| Ok(editor::add_row(p)))
            .unwrap();

        assert!(matches!(
            ws.switch_client(&second, &FixedAnswer(false)),
            Err(RatesheetError::NavigationCancelled)
        ));
        assert_eq!(ws.active_client().unwrap().id, first);
        assert_eq!(ws.session().unwrap().state(), SessionState::Dirty);

        let before = ws.state().clients[&first].clone();
        ws.switch_client(&second, &FixedAnswer(true)).unwrap();
        assert_eq!(ws.active_client().unwrap().id, second);
        assert!(ws.session().is_none());
        assert_eq!(ws.state().clients[&first], before);
    }

    #[test]
    fn commit_publishes_draft() {
        let mut ws = open();
        ws.begin_edit()
            .unwrap()
            .edit_profile(ModelKey::Flat, |p| Ok(editor::add_column(p)))
            .unwrap();
        assert_eq!(
            ws.active_client().unwrap().store.active_profile(ModelKey::Flat).unwrap().limits.len(),
            4
        );
        ws.commit().unwrap();
        assert_eq!(
            ws.active_client().unwrap().store.active_profile(ModelKey::Flat).unwrap().limits.len(),
            5
        );
    }

    #[test]
    fn restore_creates_new_client() {
        let mut ws = open();
        let original = ws.active_client().unwrap().id.clone();
        let json = ws.backup_client(&original).unwrap();

        assert_eq!(ws.restore_backup(&json, &FixedAnswer(false)).unwrap(), None);
        assert_eq!(ws.state().clients.len(), 1);

        let restored = ws.restore_backup(&json, &FixedAnswer(true)).unwrap().unwrap();
        assert_ne!(restored, original);
        assert_eq!(ws.state().clients.len(), 2);
        assert_eq!(ws.active_client().unwrap().id, restored);
        assert_eq!(
            ws.state().clients[&restored].store,
            ws.state().clients[&original].store
        );
    }

    #[test]
    fn restore_with_bad_tag_changes_nothing() {
        let mut ws = open();
        let before = ws.state().clone();
        let json = r#"{"app_version": "other", "client_data": {}}"#;
        assert!(matches!(
            ws.restore_backup(json, &FixedAnswer(true)),
            Err(RatesheetError::Backup(_))
        ));
        assert_eq!(ws.state(), &before);
    }
}
