// 💰 Deduction Ledger - Ordered deduction items and their aggregate effect
// Rate items are fractions applied against the settlement amount,
// Fixed items are absolute currency amounts. Deactivation is the soft
// delete: items never leave the ledger, they just stop contributing.

use serde::{Deserialize, Serialize};

// ============================================================================
// DEDUCTION ITEM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeductionKind {
    /// Fraction of the settlement amount (0.06 = 6%)
    Rate,

    /// Absolute currency amount
    Fixed,
}

impl DeductionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeductionKind::Rate => "rate",
            DeductionKind::Fixed => "fixed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionItem {
    /// Unique id (seeded items use stable slugs, custom items get a UUID)
    pub id: String,

    /// Display label
    pub label: String,

    #[serde(rename = "type")]
    pub kind: DeductionKind,

    /// Fraction for Rate items, currency amount for Fixed items
    pub value: f64,

    /// Soft-delete flag: inactive items contribute 0 but stay listed
    #[serde(rename = "isActive")]
    pub is_active: bool,

    /// True for items added by the user after initialization
    #[serde(rename = "isCustom", default)]
    pub is_custom: bool,
}

impl DeductionItem {
    pub fn rate(id: &str, label: &str, value: f64) -> Self {
        DeductionItem {
            id: id.to_string(),
            label: label.to_string(),
            kind: DeductionKind::Rate,
            value,
            is_active: true,
            is_custom: false,
        }
    }

    pub fn fixed(id: &str, label: &str, value: f64) -> Self {
        DeductionItem {
            id: id.to_string(),
            label: label.to_string(),
            kind: DeductionKind::Fixed,
            value,
            is_active: true,
            is_custom: false,
        }
    }

    /// Contribution of this item against a settlement amount.
    ///
    /// Inactive items contribute 0. Negative amounts or values pass
    /// through arithmetically: input sanity belongs to the calling UI.
    pub fn applied(&self, amount: f64) -> f64 {
        if !self.is_active {
            return 0.0;
        }
        match self.kind {
            DeductionKind::Rate => amount * self.value,
            DeductionKind::Fixed => self.value,
        }
    }
}

/// One row of an itemized breakdown. Inactive items appear with
/// `applied = 0` rather than being dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeductionLine {
    pub id: String,
    pub label: String,
    pub kind: DeductionKind,
    pub value: f64,
    pub is_active: bool,
    pub applied: f64,
}

// ============================================================================
// AGGREGATE
// ============================================================================

/// Sum of all active deduction contributions against `amount`.
///
/// Evaluation order does not affect the total; display order is
/// insertion order and lives in the ledger, not here.
pub fn total_deductions(amount: f64, items: &[DeductionItem]) -> f64 {
    items.iter().map(|item| item.applied(amount)).sum()
}

// ============================================================================
// LEDGER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeductionLedger {
    items: Vec<DeductionItem>,
}

impl DeductionLedger {
    pub fn new() -> Self {
        DeductionLedger { items: Vec::new() }
    }

    pub fn from_items(items: Vec<DeductionItem>) -> Self {
        DeductionLedger { items }
    }

    /// The standard deduction set a settlement starts with.
    pub fn standard() -> Self {
        DeductionLedger::from_items(vec![
            DeductionItem::rate("vat", "VAT (6%)", 0.06),
            DeductionItem::rate("additional", "Surtax (2%)", 0.02),
            DeductionItem::rate("signing", "Signing fee (2%)", 0.02),
            DeductionItem::fixed("mgmt", "Branch franchise management annual fee", 50000.00),
            DeductionItem::fixed("bid_svc", "Bid service fee", 3500.00),
            {
                let mut item = DeductionItem::fixed("bid_bond", "Bid bond", 0.00);
                item.is_active = false;
                item
            },
            DeductionItem::fixed("perf_bond", "Performance bond", 5000.00),
            DeductionItem::fixed("guarantee", "Guarantee fee", 1200.00),
            DeductionItem::fixed("fine", "Fine", 0.00),
            DeductionItem::fixed("others", "Other deductions", 0.00),
        ])
    }

    pub fn items(&self) -> &[DeductionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&DeductionItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut DeductionItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Append a fresh custom item (Fixed / 0 / active) and return its id.
    pub fn add_custom(&mut self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.items.push(DeductionItem {
            id: id.clone(),
            label: "New deduction".to_string(),
            kind: DeductionKind::Fixed,
            value: 0.0,
            is_active: true,
            is_custom: true,
        });
        id
    }

    /// Update an item's value in place. Unknown ids are ignored.
    pub fn update_value(&mut self, id: &str, value: f64) {
        if let Some(item) = self.get_mut(id) {
            item.value = value;
        }
    }

    /// Toggle an item on or off (the soft delete).
    pub fn set_active(&mut self, id: &str, active: bool) {
        if let Some(item) = self.get_mut(id) {
            item.is_active = active;
        }
    }

    pub fn rename(&mut self, id: &str, label: &str) {
        if let Some(item) = self.get_mut(id) {
            item.label = label.to_string();
        }
    }

    /// Aggregate effect of the ledger against `amount`.
    pub fn total(&self, amount: f64) -> f64 {
        total_deductions(amount, &self.items)
    }

    /// Itemized breakdown in insertion order, inactive items shown with 0.
    pub fn breakdown(&self, amount: f64) -> Vec<DeductionLine> {
        self.items
            .iter()
            .map(|item| DeductionLine {
                id: item.id.clone(),
                label: item.label.clone(),
                kind: item.kind,
                value: item.value,
                is_active: item.is_active,
                applied: item.applied(amount),
            })
            .collect()
    }
}

impl Default for DeductionLedger {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
