use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::invoice::Invoice;
use crate::domain::payment::MonthlyPayment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Monthly,
    Invoice,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Monthly => "monthly",
            EntityKind::Invoice => "invoice",
        }
    }

    /// Whether `status` is part of this entity kind's lifecycle at all.
    pub fn admits(&self, status: LedgerStatus) -> bool {
        match self {
            EntityKind::Monthly => matches!(
                status,
                LedgerStatus::Pending | LedgerStatus::Completed | LedgerStatus::Failed
            ),
            EntityKind::Invoice => matches!(
                status,
                LedgerStatus::Pending | LedgerStatus::Processing | LedgerStatus::Paid
            ),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Paid,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Pending => "pending",
            LedgerStatus::Processing => "processing",
            LedgerStatus::Completed => "completed",
            LedgerStatus::Failed => "failed",
            LedgerStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LedgerStatus::Pending),
            "processing" => Some(LedgerStatus::Processing),
            "completed" => Some(LedgerStatus::Completed),
            "failed" => Some(LedgerStatus::Failed),
            "paid" => Some(LedgerStatus::Paid),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LedgerStatus::Completed | LedgerStatus::Failed | LedgerStatus::Paid
        )
    }

    /// Terminal states that count as money received.
    pub fn is_settled(&self) -> bool {
        matches!(self, LedgerStatus::Completed | LedgerStatus::Paid)
    }
}

impl std::fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl EntityRef {
    pub fn monthly(id: Uuid) -> Self {
        Self {
            kind: EntityKind::Monthly,
            id,
        }
    }

    pub fn invoice(id: Uuid) -> Self {
        Self {
            kind: EntityKind::Invoice,
            id,
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Who is asking for a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Actor {
    Gateway,
    Admin { admin_id: i64 },
}

impl Actor {
    pub fn label(&self) -> String {
        match self {
            Actor::Gateway => "gateway".to_string(),
            Actor::Admin { admin_id } => format!("admin:{}", admin_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    /// Target equals the current status; nothing to write.
    NoOp,
    Allowed,
    Illegal,
}

/// The closed transition table shared by both ledger entity kinds.
///
/// ```text
/// monthly: pending -> completed   (gateway | admin)
/// monthly: pending -> failed      (gateway | admin)
/// invoice: pending -> processing  (gateway)
/// invoice: processing -> paid     (admin)
/// invoice: pending -> paid        (admin)
/// ```
///
/// The gateway can never settle an invoice on its own.
pub fn check_transition(
    kind: EntityKind,
    from: LedgerStatus,
    to: LedgerStatus,
    actor: &Actor,
) -> TransitionCheck {
    if !kind.admits(to) {
        return TransitionCheck::Illegal;
    }
    if from == to {
        return TransitionCheck::NoOp;
    }

    let is_admin = matches!(actor, Actor::Admin { .. });
    let allowed = match (kind, from, to) {
        (EntityKind::Monthly, LedgerStatus::Pending, LedgerStatus::Completed) => true,
        (EntityKind::Monthly, LedgerStatus::Pending, LedgerStatus::Failed) => true,
        (EntityKind::Invoice, LedgerStatus::Pending, LedgerStatus::Processing) => !is_admin,
        (EntityKind::Invoice, LedgerStatus::Processing, LedgerStatus::Paid) => is_admin,
        (EntityKind::Invoice, LedgerStatus::Pending, LedgerStatus::Paid) => is_admin,
        _ => false,
    };

    if allowed {
        TransitionCheck::Allowed
    } else {
        TransitionCheck::Illegal
    }
}

/// A ledger entity of either kind, as found by its transaction reference.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEntry {
    Monthly(MonthlyPayment),
    Invoice(Invoice),
}

impl LedgerEntry {
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            LedgerEntry::Monthly(p) => EntityRef::monthly(p.id),
            LedgerEntry::Invoice(i) => EntityRef::invoice(i.id),
        }
    }

    pub fn status(&self) -> LedgerStatus {
        match self {
            LedgerEntry::Monthly(p) => p.status,
            LedgerEntry::Invoice(i) => i.status,
        }
    }

    pub fn amount(&self) -> rust_decimal::Decimal {
        match self {
            LedgerEntry::Monthly(p) => p.amount,
            LedgerEntry::Invoice(i) => i.amount,
        }
    }

    pub fn transaction_reference(&self) -> &str {
        match self {
            LedgerEntry::Monthly(p) => &p.transaction_reference,
            LedgerEntry::Invoice(i) => &i.transaction_reference,
        }
    }

    pub fn user_id(&self) -> i64 {
        match self {
            LedgerEntry::Monthly(p) => p.user_id,
            LedgerEntry::Invoice(i) => i.user_id,
        }
    }

    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        match self {
            LedgerEntry::Monthly(p) => p.created_at,
            LedgerEntry::Invoice(i) => i.created_at,
        }
    }
}

/// One committed status change, written alongside the change itself.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionRecord {
    pub entity: EntityRef,
    pub from_status: LedgerStatus,
    pub to_status: LedgerStatus,
    pub actor: String,
    pub gateway_ref_id: Option<String>,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}
