//! Confirmation port: blocking yes/no questions put to the operator.

pub trait ConfirmPort {
    /// Returns `true` when the operator accepts.
    fn confirm(&self, question: &str) -> bool;
}

/// Accepts or declines every question without asking.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl ConfirmPort for FixedAnswer {
    fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}
