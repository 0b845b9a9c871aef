#![allow(dead_code)]

use ratesheet::domain::error::RatesheetError;
use ratesheet::domain::model_key::ModelKey;
use ratesheet::domain::rate_table::{Client, ModelBucket, Profile, RootState, Route};
use ratesheet::ports::confirm_port::ConfirmPort;
use ratesheet::ports::persistence_port::PersistencePort;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// Persistence held in memory; `fail` makes every save error out.
pub struct InMemoryPersistence {
    pub saved: RefCell<Option<RootState>>,
    pub saves: Cell<usize>,
    pub fail: Cell<bool>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            saved: RefCell::new(None),
            saves: Cell::new(0),
            fail: Cell::new(false),
        }
    }

    pub fn with_state(state: RootState) -> Self {
        let store = Self::new();
        *store.saved.borrow_mut() = Some(state);
        store
    }

    pub fn saved_state(&self) -> RootState {
        self.saved.borrow().clone().expect("nothing saved")
    }

    pub fn saved_json(&self) -> String {
        serde_json::to_string(&self.saved_state()).unwrap()
    }
}

impl PersistencePort for InMemoryPersistence {
    fn load(&self) -> Result<Option<RootState>, RatesheetError> {
        Ok(self.saved.borrow().clone())
    }

    fn save(&self, state: &RootState) -> Result<(), RatesheetError> {
        if self.fail.get() {
            return Err(RatesheetError::Storage {
                reason: "simulated write failure".into(),
            });
        }
        *self.saved.borrow_mut() = Some(state.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

/// Answers confirmations from a script and records every question asked.
/// Declines once the script runs out.
pub struct ScriptedConfirm {
    answers: RefCell<VecDeque<bool>>,
    pub asked: RefCell<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().copied().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl ConfirmPort for ScriptedConfirm {
    fn confirm(&self, question: &str) -> bool {
        self.asked.borrow_mut().push(question.to_string());
        self.answers.borrow_mut().pop_front().unwrap_or(false)
    }
}

pub fn route(origin: &str, dest: &str, rates: &[Option<f64>]) -> Route {
    Route {
        origin: origin.to_string(),
        dest: dest.to_string(),
        rates: rates.to_vec(),
    }
}

/// Two-bracket table: 1-50 and 51-100.
pub fn domestic_profile() -> Profile {
    Profile {
        name: "Domestic".into(),
        limits: vec![50.0, 100.0],
        rows: vec![
            route("MNL", "CEB", &[Some(10.0), Some(8.0)]),
            route("MNL", "DVO", &[Some(12.0), None]),
        ],
    }
}

/// Excess table: base charge up to 50 kg, per-kg rate above.
pub fn excess_profile() -> Profile {
    Profile {
        name: "Excess".into(),
        limits: vec![50.0, 999_999.0],
        rows: vec![route("MNL", "CEB", &[Some(500.0), Some(95.0)])],
    }
}

/// Client whose active table for every model is `profile` (excess models
/// get [`excess_profile`]).
pub fn client_with_tables(name: &str, profile: &Profile) -> Client {
    let mut client = Client::new(name);
    for model in ModelKey::ALL {
        let table = if model.is_excess() {
            excess_profile()
        } else {
            profile.clone()
        };
        *client.store.bucket_mut(model) = ModelBucket::with_profile(format!("p_{}", model.key()), table);
    }
    client
}

pub fn state_with(clients: Vec<Client>) -> RootState {
    RootState {
        active_client_id: clients.first().map(|c| c.id.clone()),
        clients: clients.into_iter().map(|c| (c.id.clone(), c)).collect(),
    }
}
