use thiserror::Error;

use crate::domain::ledger::{EntityKind, LedgerStatus};

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("month must be the first day of a month (YYYY-MM-01), got {0:?}")]
    InvalidPeriod(String),

    #[error("weight_kg must be positive and in range, and price to a non-zero amount")]
    InvalidWeight,

    #[error("look-back window is out of range")]
    InvalidWindow,

    #[error("special request {0} is not approved")]
    RequestNotApproved(i64),

    #[error("invoice is {0} and can no longer be changed")]
    InvoiceLocked(LedgerStatus),

    #[error("{kind} cannot move from {from} to {to}")]
    IllegalTransition {
        kind: EntityKind,
        from: LedgerStatus,
        to: LedgerStatus,
    },

    #[error("{kind} is {status}; only pending entries can be sent to the gateway")]
    InvalidState { kind: EntityKind, status: LedgerStatus },

    #[error("unknown transaction reference")]
    UnknownTransaction,

    #[error("callback signature does not match")]
    SignatureMismatch,

    #[error("concurrent update lost the race, retry")]
    PersistenceConflict,

    #[error("{0} not found")]
    NotFound(String),

    #[error("missing or invalid request identity")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidPeriod(_) => "INVALID_PERIOD",
            LedgerError::InvalidWeight => "INVALID_WEIGHT",
            LedgerError::InvalidWindow => "INVALID_WINDOW",
            LedgerError::RequestNotApproved(_) => "REQUEST_NOT_APPROVED",
            LedgerError::InvoiceLocked(_) => "INVOICE_LOCKED",
            LedgerError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            LedgerError::InvalidState { .. } => "INVALID_STATE",
            LedgerError::UnknownTransaction => "UNKNOWN_TRANSACTION",
            LedgerError::SignatureMismatch => "SIGNATURE_MISMATCH",
            LedgerError::PersistenceConflict => "PERSISTENCE_CONFLICT",
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::Unauthorized => "UNAUTHORIZED",
            LedgerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Errors that must never be described to the caller in detail.
    pub fn is_security_event(&self) -> bool {
        matches!(
            self,
            LedgerError::UnknownTransaction | LedgerError::SignatureMismatch
        )
    }
}
