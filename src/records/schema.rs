//! Request body validation
//!
//! Every write body goes through [`parse_body`]: JSON syntax, required
//! fields, serde typing, then per-entity field checks. All problems found
//! are reported together as a list of [`FieldIssue`]s.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;

use super::units::is_base_units;
use super::{AtomPatch, NewAtom, NewContractEvent, NewStakingPosition, NewTransaction, TransactionPatch};
use crate::types::{ApiError, FieldIssue, Result};

/// A request body with a fixed schema
pub trait Schema: DeserializeOwned {
    /// Entity name used in error messages ("Invalid {ENTITY} data")
    const ENTITY: &'static str;

    /// camelCase keys that must be present and non-null
    const REQUIRED: &'static [&'static str];

    /// Field-level checks run after deserialization
    fn check(&self, _issues: &mut Vec<FieldIssue>) {}

    /// Run [`Schema::check`] on an already-typed value
    fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();
        self.check(&mut issues);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation {
                entity: Self::ENTITY,
                issues,
            })
        }
    }
}

/// Parse and validate a JSON body
pub fn parse_body<T: Schema>(body: &[u8]) -> Result<T> {
    let invalid = |issues| ApiError::Validation {
        entity: T::ENTITY,
        issues,
    };

    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| invalid(vec![FieldIssue::new("", format!("Malformed JSON: {e}"))]))?;

    let obj = value
        .as_object()
        .ok_or_else(|| invalid(vec![FieldIssue::new("", "Expected a JSON object")]))?;

    let missing: Vec<FieldIssue> = T::REQUIRED
        .iter()
        .copied()
        .filter(|key| obj.get(*key).map_or(true, |v| v.is_null()))
        .map(|key| FieldIssue::new(key, "Required"))
        .collect();
    if !missing.is_empty() {
        return Err(invalid(missing));
    }

    let parsed: T = serde_json::from_value(value)
        .map_err(|e| invalid(vec![FieldIssue::new("", e.to_string())]))?;

    parsed.validate()?;
    Ok(parsed)
}

fn require_text(issues: &mut Vec<FieldIssue>, path: &str, value: &str) {
    if value.trim().is_empty() {
        issues.push(FieldIssue::new(path, "Must not be empty"));
    }
}

fn require_base_units(issues: &mut Vec<FieldIssue>, path: &str, value: Option<&str>) {
    if let Some(v) = value {
        if !is_base_units(v) {
            issues.push(FieldIssue::new(path, "Expected a non-negative integer string"));
        }
    }
}

fn require_path_safe(issues: &mut Vec<FieldIssue>, path: &str, value: &str) {
    if value.contains('/') || value.contains('?') || value.contains(char::is_whitespace) {
        issues.push(FieldIssue::new(path, "Must not contain '/', '?' or whitespace"));
    }
}

impl Schema for NewAtom {
    const ENTITY: &'static str = "atom";
    const REQUIRED: &'static [&'static str] = &["chainId", "atomId", "name", "creator"];

    fn check(&self, issues: &mut Vec<FieldIssue>) {
        require_text(issues, "atomId", &self.atom_id);
        require_text(issues, "name", &self.name);
        require_text(issues, "creator", &self.creator);
        require_base_units(issues, "totalStake", self.total_stake.as_deref());
        require_base_units(issues, "stakeholderCount", self.stakeholder_count.as_deref());
    }
}

impl Schema for AtomPatch {
    const ENTITY: &'static str = "atom";
    const REQUIRED: &'static [&'static str] = &[];

    fn check(&self, issues: &mut Vec<FieldIssue>) {
        if let Some(name) = &self.name {
            require_text(issues, "name", name);
        }
        require_base_units(issues, "totalStake", self.total_stake.as_deref());
        require_base_units(issues, "stakeholderCount", self.stakeholder_count.as_deref());
    }
}

impl Schema for NewTransaction {
    const ENTITY: &'static str = "transaction";
    const REQUIRED: &'static [&'static str] = &["hash", "type", "from", "status"];

    fn check(&self, issues: &mut Vec<FieldIssue>) {
        require_text(issues, "hash", &self.hash);
        require_path_safe(issues, "hash", &self.hash);
        require_text(issues, "from", &self.from);
        require_base_units(issues, "value", self.value.as_deref());
        require_base_units(issues, "gasUsed", self.gas_used.as_deref());
        require_base_units(issues, "gasPrice", self.gas_price.as_deref());
    }
}

impl Schema for TransactionPatch {
    const ENTITY: &'static str = "transaction";
    const REQUIRED: &'static [&'static str] = &[];

    fn check(&self, issues: &mut Vec<FieldIssue>) {
        require_base_units(issues, "value", self.value.as_deref());
        require_base_units(issues, "gasUsed", self.gas_used.as_deref());
        require_base_units(issues, "gasPrice", self.gas_price.as_deref());
    }
}

impl Schema for NewContractEvent {
    const ENTITY: &'static str = "event";
    const REQUIRED: &'static [&'static str] =
        &["contractAddress", "eventName", "blockNumber", "transactionHash"];

    fn check(&self, issues: &mut Vec<FieldIssue>) {
        require_text(issues, "contractAddress", &self.contract_address);
        require_text(issues, "eventName", &self.event_name);
        require_text(issues, "transactionHash", &self.transaction_hash);
    }
}

impl Schema for NewStakingPosition {
    const ENTITY: &'static str = "staking position";
    const REQUIRED: &'static [&'static str] = &["userAddress", "atomId", "amount"];

    fn check(&self, issues: &mut Vec<FieldIssue>) {
        require_text(issues, "userAddress", &self.user_address);
        require_text(issues, "atomId", &self.atom_id);
        require_base_units(issues, "amount", Some(&self.amount));
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Text(String),
}

impl NumberOrString {
    fn into_u64<E: de::Error>(self) -> std::result::Result<u64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| E::custom(format!("expected an unsigned integer, got {s:?}"))),
        }
    }
}

/// Accept `1337` or `"1337"`; clients send numeric columns either way.
pub fn de_u64_lenient<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrString::deserialize(deserializer)?.into_u64()
}

pub fn de_opt_u64_lenient<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(NumberOrString::into_u64)
        .transpose()
}
