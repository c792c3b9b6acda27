//! Domain types for logged income and expense transactions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::common::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.kind == EntryKind::Expense
    }

    pub fn is_income(&self) -> bool {
        self.kind == EntryKind::Income
    }
}

impl Entity for Transaction {
    type Draft = TransactionDraft;
    type Patch = TransactionPatch;

    const RESOURCE: &'static str = "transactions";
    const LABEL: &'static str = "transaction";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn from_draft(draft: TransactionDraft) -> Self {
        Self {
            id: None,
            title: draft.title,
            amount: draft.amount,
            kind: draft.kind,
            category_id: draft.category_id,
            category_name: None,
            date: draft.date,
            description: draft.description,
            created_at: None,
            updated_at: None,
        }
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
        self.created_at = Some(created_at);
        self.updated_at = Some(updated_at);
    }

    fn apply_patch(&mut self, patch: &TransactionPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(category_id) = &patch.category_id {
            self.category_id = category_id.clone();
            // category_name belongs to the previous category id.
            self.category_name = None;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
    }
}

/// Fields submitted when logging a transaction. The category name is resolved by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    pub title: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub category_id: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TransactionDraft {
    pub fn new(
        title: impl Into<String>,
        amount: f64,
        kind: EntryKind,
        category_id: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            title: title.into(),
            amount,
            kind,
            category_id: category_id.into(),
            date,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntryKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
