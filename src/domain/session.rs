//! Draft editing session for one client's rate store.
//!
//! Edits land on a private copy of the store. Nothing outside the session sees
//! them until [`DraftSession::commit`] swaps the draft into the client in a
//! single assignment. Leaving with unsaved changes asks the operator first.
//!
//! ```text
//!   load ──> Clean <──── edit ────> Dirty
//!              │  ^                   │
//!              │  └── commit ─────────┤   (Committing while saving)
//!              └──── leave ──> Discarded <── leave (confirmed)
//! ```

use crate::domain::calculation::{self, CalcInputs, CalcResult};
use crate::domain::editor::EditError;
use crate::domain::error::RatesheetError;
use crate::domain::model_key::ModelKey;
use crate::domain::rate_table::{Client, ModelBucket, Profile, RateStore, RootState};
use crate::domain::sheet::{self, SheetGrid};
use crate::domain::tariff::Tariff;
use crate::ports::confirm_port::ConfirmPort;
use crate::ports::persistence_port::PersistencePort;
use log::{debug, info};

pub const DISCARD_QUESTION: &str = "You have unsaved changes. Discard them?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Clean,
    Dirty,
    Committing,
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct DraftSession {
    client_id: String,
    baseline: RateStore,
    draft: RateStore,
    state: SessionState,
}

impl DraftSession {
    pub fn load(client: &Client) -> Self {
        debug!("opening draft for client {}", client.id);
        Self {
            client_id: client.id.clone(),
            baseline: client.store.clone(),
            draft: client.store.clone(),
            state: SessionState::Clean,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == SessionState::Dirty
    }

    pub fn is_open(&self) -> bool {
        self.state != SessionState::Discarded
    }

    pub fn draft(&self) -> &RateStore {
        &self.draft
    }

    pub fn active_profile(&self, model: ModelKey) -> Option<&Profile> {
        self.draft.active_profile(model)
    }

    fn ensure_open(&self) -> Result<(), RatesheetError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(RatesheetError::SessionClosed)
        }
    }

    fn replace_bucket(&mut self, model: ModelKey, bucket: ModelBucket) {
        *self.draft.bucket_mut(model) = bucket;
        self.state = if self.draft == self.baseline {
            SessionState::Clean
        } else {
            SessionState::Dirty
        };
    }

    /// Applies an edit to the model's active table.
    pub fn edit_profile<F>(&mut self, model: ModelKey, edit: F) -> Result<(), RatesheetError>
    where
        F: FnOnce(&Profile) -> Result<Profile, EditError>,
    {
        self.ensure_open()?;
        let bucket = self
            .draft
            .bucket(model)
            .ok_or(RatesheetError::NoActiveProfile { model })?;
        let id = bucket
            .active_profile_id
            .clone()
            .ok_or(RatesheetError::NoActiveProfile { model })?;
        let current = bucket
            .profiles
            .get(&id)
            .ok_or(RatesheetError::NoActiveProfile { model })?;

        let next = edit(current)?;
        let mut bucket = bucket.clone();
        bucket.profiles.insert(id, next);
        self.replace_bucket(model, bucket);
        Ok(())
    }

    /// Applies an edit to the model's set of tables.
    pub fn edit_bucket<F>(&mut self, model: ModelKey, edit: F) -> Result<(), RatesheetError>
    where
        F: FnOnce(&ModelBucket) -> Result<ModelBucket, EditError>,
    {
        self.ensure_open()?;
        let empty = ModelBucket::default();
        let current = self.draft.bucket(model).unwrap_or(&empty);
        let next = edit(current)?;
        self.replace_bucket(model, next);
        Ok(())
    }

    /// Replaces the active table's rows (and, once confirmed, its brackets)
    /// with a parsed sheet. Any failure leaves the draft untouched.
    pub fn import_sheet(
        &mut self,
        model: ModelKey,
        grid: &SheetGrid,
        confirm: &dyn ConfirmPort,
    ) -> Result<(), RatesheetError> {
        self.ensure_open()?;
        let imported = sheet::parse_import(grid)?;
        let profile = self
            .active_profile(model)
            .ok_or(RatesheetError::NoActiveProfile { model })?;
        let next = sheet::apply_import(profile, imported, confirm)?;
        info!(
            "imported {} rows into {} table '{}'",
            next.rows.len(),
            model,
            next.name
        );
        self.edit_profile(model, |_| Ok(next))
    }

    /// Prices a shipment against the draft, so unsaved edits can be tried out.
    pub fn calculate(
        &self,
        model: ModelKey,
        inputs: &CalcInputs,
        tariff: &Tariff,
    ) -> Result<CalcResult, RatesheetError> {
        let profile = self
            .active_profile(model)
            .ok_or(RatesheetError::NoActiveProfile { model })?;
        Ok(calculation::calculate(profile, model, inputs, tariff))
    }

    /// Swaps the draft into the client and saves. On a failed save the
    /// client's previous store is put back and the draft stays dirty.
    pub fn commit(
        &mut self,
        root: &mut RootState,
        persistence: &dyn PersistencePort,
    ) -> Result<(), RatesheetError> {
        self.ensure_open()?;
        let client = root
            .clients
            .get_mut(&self.client_id)
            .ok_or_else(|| RatesheetError::UnknownClient {
                id: self.client_id.clone(),
            })?;

        let resume = self.state;
        self.state = SessionState::Committing;
        let previous = std::mem::replace(&mut client.store, self.draft.clone());

        if let Err(e) = persistence.save(root) {
            if let Some(client) = root.clients.get_mut(&self.client_id) {
                client.store = previous;
            }
            self.state = resume;
            return Err(e);
        }

        self.baseline = self.draft.clone();
        self.state = SessionState::Clean;
        info!("committed tables for client {}", self.client_id);
        Ok(())
    }

    /// Navigation guard. A dirty draft is only dropped once the operator
    /// confirms; otherwise the session stays dirty.
    pub fn leave(&mut self, confirm: &dyn ConfirmPort) -> Navigation {
        if self.state == SessionState::Dirty && !confirm.confirm(DISCARD_QUESTION) {
            return Navigation::Cancelled;
        }
        if self.state == SessionState::Dirty {
            info!("discarded unsaved changes for client {}", self.client_id);
        }
        self.draft = self.baseline.clone();
        self.state = SessionState::Discarded;
        Navigation::Proceed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::editor;
    use crate::ports::confirm_port::FixedAnswer;
    use std::cell::{Cell, RefCell};

    struct MemoryStore {
        saved: RefCell<Option<RootState>>,
        fail: Cell<bool>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                saved: RefCell::new(None),
                fail: Cell::new(false),
            }
        }
    }

    impl PersistencePort for MemoryStore {
        fn load(&self) -> Result<Option<RootState>, RatesheetError> {
            Ok(self.saved.borrow().clone())
        }

        fn save(&self, state: &RootState) -> Result<(), RatesheetError> {
            if self.fail.get() {
                return Err(RatesheetError::Storage {
                    reason: "disk full".into(),
                });
            }
            *self.saved.borrow_mut() = Some(state.clone());
            Ok(())
        }
    }

    fn root_with_client() -> (RootState, String) {
        let client = Client::new("Acme");
        let id = client.id.clone();
        let root = RootState {
            active_client_id: Some(id.clone()),
            clients: [(id.clone(), client)].into_iter().collect(),
        };
        (root, id)
    }

    #[test]
    fn load_starts_clean() {
        let (root, id) = root_with_client();
        let session = DraftSession::load(&root.clients[&id]);
        assert_eq!(session.state(), SessionState::Clean);
        assert_eq!(session.draft(), &root.clients[&id].store);
    }

    #[test]
    fn edit_makes_dirty_without_touching_persisted() {
        let (root, id) = root_with_client();
        let before = root.clone();
        let mut session = DraftSession::load(&root.clients[&id]);
        session
            .edit_profile(ModelKey::Fixed, |p| Ok(editor::add_row(p)))
            .unwrap();
        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(root, before);
        assert_eq!(session.active_profile(ModelKey::Fixed).unwrap().rows.len(), 2);
    }

    #[test]
    fn rejected_edit_keeps_state() {
        let (root, id) = root_with_client();
        let mut session = DraftSession::load(&root.clients[&id]);
        let err = session
            .edit_profile(ModelKey::Fixed, |p| editor::delete_row(p, 0))
            .unwrap_err();
        assert!(matches!(err, RatesheetError::Edit(EditError::LastRow)));
        assert_eq!(session.state(), SessionState::Clean);
        assert_eq!(session.draft(), &root.clients[&id].store);
    }

    #[test]
    fn reverting_an_edit_returns_to_clean() {
        let (root, id) = root_with_client();
        let mut session = DraftSession::load(&root.clients[&id]);
        session
            .edit_profile(ModelKey::Flat, |p| Ok(editor::add_row(p)))
            .unwrap();
        session
            .edit_profile(ModelKey::Flat, |p| editor::delete_row(p, 1))
            .unwrap();
        assert_eq!(session.state(), SessionState::Clean);
    }

    #[test]
    fn commit_replaces_store_and_saves() {
        let (mut root, id) = root_with_client();
        let store = MemoryStore::new();
        let mut session = DraftSession::load(&root.clients[&id]);
        session
            .edit_profile(ModelKey::Fixed, |p| Ok(editor::add_column(p)))
            .unwrap();
        session.commit(&mut root, &store).unwrap();

        assert_eq!(session.state(), SessionState::Clean);
        assert_eq!(&root.clients[&id].store, session.draft());
        assert_eq!(store.saved.borrow().as_ref(), Some(&root));
    }

    #[test]
    fn commit_without_edits_reproduces_state() {
        let (mut root, id) = root_with_client();
        let before = root.clone();
        let store = MemoryStore::new();
        let mut session = DraftSession::load(&root.clients[&id]);
        session.commit(&mut root, &store).unwrap();
        assert_eq!(root, before);
    }

    #[test]
    fn failed_save_rolls_back() {
        let (mut root, id) = root_with_client();
        let before = root.clone();
        let store = MemoryStore::new();
        store.fail.set(true);
        let mut session = DraftSession::load(&root.clients[&id]);
        session
            .edit_profile(ModelKey::Fixed, |p| Ok(editor::add_row(p)))
            .unwrap();
        assert!(session.commit(&mut root, &store).is_err());
        assert_eq!(root, before);
        assert_eq!(session.state(), SessionState::Dirty);
    }

    #[test]
    fn leaving_dirty_session_asks_first() {
        let (root, id) = root_with_client();
        let mut session = DraftSession::load(&root.clients[&id]);
        session
            .edit_profile(ModelKey::Fixed, |p| Ok(editor::add_row(p)))
            .unwrap();

        assert_eq!(session.leave(&FixedAnswer(false)), Navigation::Cancelled);
        assert_eq!(session.state(), SessionState::Dirty);

        assert_eq!(session.leave(&FixedAnswer(true)), Navigation::Proceed);
        assert_eq!(session.state(), SessionState::Discarded);
    }

    #[test]
    fn leaving_clean_session_does_not_ask() {
        let (root, id) = root_with_client();
        let mut session = DraftSession::load(&root.clients[&id]);
        assert_eq!(session.leave(&FixedAnswer(false)), Navigation::Proceed);
        assert!(!session.is_open());
    }

    #[test]
    fn discarded_session_rejects_edits_and_commit() {
        let (mut root, id) = root_with_client();
        let store = MemoryStore::new();
        let mut session = DraftSession::load(&root.clients[&id]);
        session.leave(&FixedAnswer(true));
        assert!(matches!(
            session.edit_profile(ModelKey::Fixed, |p| Ok(editor::add_row(p))),
            Err(RatesheetError::SessionClosed)
        ));
        assert!(matches!(
            session.commit(&mut root, &store),
            Err(RatesheetError::SessionClosed)
        ));
        assert!(store.saved.borrow().is_none());
    }

    #[test]
    fn failed_import_leaves_draft_untouched() {
        let (root, id) = root_with_client();
        let mut session = DraftSession::load(&root.clients[&id]);
        let grid = vec![vec!["Origin".to_string(), "Destination".to_string(), "rate_70".to_string()]];
        let err = session
            .import_sheet(ModelKey::Fixed, &grid, &FixedAnswer(false))
            .unwrap_err();
        assert!(matches!(
            err,
            RatesheetError::Import(crate::domain::sheet::ImportError::StructureMismatch)
        ));
        assert_eq!(session.state(), SessionState::Clean);
    }

    #[test]
    fn bucket_edits_go_through_draft() {
        let (root, id) = root_with_client();
        let mut session = DraftSession::load(&root.clients[&id]);
        session
            .edit_bucket(ModelKey::Excess, |b| editor::add_profile(b, "Express").map(|(b, _)| b))
            .unwrap();
        assert_eq!(
            session.active_profile(ModelKey::Excess).unwrap().name,
            "Express"
        );
        assert!(session.is_dirty());
    }
}
