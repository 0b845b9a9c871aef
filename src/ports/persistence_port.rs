//! Persistence port for the whole application state.

use crate::domain::error::RatesheetError;
use crate::domain::rate_table::RootState;

pub trait PersistencePort {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<RootState>, RatesheetError>;

    fn save(&self, state: &RootState) -> Result<(), RatesheetError>;
}
