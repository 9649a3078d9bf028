//! Lead-gate unlock state.
//!
//! The viewer-side gate has two states, `Locked` and `Unlocked`, and one
//! transition: a valid form submission moves `Locked → Unlocked`. There is no
//! way back. The flag outlives the page view through a persistence boundary
//! keyed by site id: [`GateStore`]. The generated runtime script implements
//! the same machine on top of `localStorage` with the key from
//! [`storage_key`]. [`MemoryGateStore`] stands in for it in tests and
//! previews.
//!
//! A disabled policy has no gate at all: the state is `Unlocked` from the
//! start and nothing is ever locked.

use crate::error::SubmissionError;
use crate::model::{FieldKind, LeadGatePolicy};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Key under which a site's unlock flag is persisted.
pub fn storage_key(site_id: &str) -> String {
    format!("pdfdeck:{site_id}:unlocked")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Locked,
    Unlocked,
}

/// Reads and writes one boolean per site.
pub trait GateStore {
    fn load(&self, key: &str) -> bool;
    fn save(&mut self, key: &str, unlocked: bool);
}

/// In-memory [`GateStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryGateStore {
    flags: HashMap<String, bool>,
}

impl MemoryGateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GateStore for MemoryGateStore {
    fn load(&self, key: &str) -> bool {
        self.flags.get(key).copied().unwrap_or(false)
    }

    fn save(&mut self, key: &str, unlocked: bool) {
        self.flags.insert(key.to_string(), unlocked);
    }
}

/// Which pages a navigation state machine may not enter.
///
/// Locked pages always form a suffix: everything at or after `first_locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageLock {
    first_locked: Option<usize>,
}

impl PageLock {
    /// No page is locked.
    pub fn open() -> Self {
        Self { first_locked: None }
    }

    pub fn from_index(first_locked: usize) -> Self {
        Self {
            first_locked: Some(first_locked),
        }
    }

    pub fn blocks(&self, index: usize) -> bool {
        self.first_locked.is_some_and(|first| index >= first)
    }
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// The gate moved from `Locked` to `Unlocked`.
    Unlocked,
    /// The gate was already open; nothing changed.
    AlreadyUnlocked,
}

/// The gate for one site, bound to a persistence backend.
pub struct Gate<S: GateStore> {
    policy: LeadGatePolicy,
    key: String,
    state: GateState,
    store: S,
}

impl<S: GateStore> Gate<S> {
    /// Restore the gate for `site_id`, reading any persisted unlock.
    pub fn new(policy: LeadGatePolicy, site_id: &str, store: S) -> Self {
        let key = storage_key(site_id);
        let state = if !policy.enabled || store.load(&key) {
            GateState::Unlocked
        } else {
            GateState::Locked
        };
        debug!("Gate for '{}' starts {:?}", site_id, state);
        Self {
            policy,
            key,
            state,
            store,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_page_locked(&self, index: usize) -> bool {
        self.state == GateState::Locked && self.policy.is_locked(index)
    }

    pub fn page_lock(&self) -> PageLock {
        match self.state {
            GateState::Locked if self.policy.enabled => {
                PageLock::from_index(self.policy.effective_free_pages())
            }
            _ => PageLock::open(),
        }
    }

    /// Validate a submission and unlock every page at once.
    ///
    /// Fields are checked against the policy: required fields must be
    /// non-blank and email fields must look like an address.
    pub fn submit(
        &mut self,
        fields: &BTreeMap<String, String>,
    ) -> Result<UnlockOutcome, SubmissionError> {
        validate_submission(&self.policy, fields)?;
        if self.state == GateState::Unlocked {
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }
        self.state = GateState::Unlocked;
        self.store.save(&self.key, true);
        debug!("Gate '{}' unlocked", self.key);
        Ok(UnlockOutcome::Unlocked)
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

/// Check submitted values against the policy's field list.
pub fn validate_submission(
    policy: &LeadGatePolicy,
    fields: &BTreeMap<String, String>,
) -> Result<(), SubmissionError> {
    for field in &policy.fields {
        let value = fields.get(&field.name).map(|v| v.trim()).unwrap_or("");
        if value.is_empty() {
            if field.required {
                return Err(SubmissionError::MissingField {
                    field: field.name.clone(),
                });
            }
            continue;
        }
        if field.kind == FieldKind::Email && !looks_like_email(value) {
            return Err(SubmissionError::InvalidEmail {
                field: field.name.clone(),
            });
        }
    }
    Ok(())
}

/// The same loose check browsers apply to `<input type="email">`.
fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !s.contains(char::is_whitespace)
        }
        None => false,
    }
}
