//! # Demo Scenarios
//!
//! A scenario names a schema, the values the holder is issued, and what
//! the verifier asks for. Scenario files are YAML:
//!
//! ```yaml
//! schema:
//!   name: employee
//!   version: "1.0"
//!   attributes: [name, age]
//! values:
//!   name: Alice
//!   age: "30"
//! reveal:
//!   name: Alice
//! predicates:
//!   - attribute: age
//!     p_type: ">="
//!     value: 18
//! capacity: 10
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use zkcred_core::{
    CredentialFieldReference, CredentialPredicateReference, PredicateType, ProofRequestBuilder,
};

/// Ledger time the demo clock starts at, Unix seconds.
pub const DEFAULT_LEDGER_START: i64 = 1_700_000_000;

/// Schema to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaSpec {
    pub name: String,
    pub version: String,
    pub attributes: Vec<String>,
}

/// One predicate the verifier requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredicateSpec {
    pub attribute: String,
    #[serde(default = "default_p_type")]
    pub p_type: PredicateType,
    pub value: i32,
}

/// A full lifecycle scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub schema: SchemaSpec,
    /// Raw attribute values issued to the holder.
    pub values: BTreeMap<String, String>,
    /// Attributes the verifier asks to see, with the value it expects.
    /// An empty expected value reveals without checking.
    #[serde(default)]
    pub reveal: BTreeMap<String, String>,
    #[serde(default)]
    pub predicates: Vec<PredicateSpec>,
    #[serde(default = "default_revocable")]
    pub revocable: bool,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default = "default_ledger_start")]
    pub ledger_start: i64,
}

fn default_p_type() -> PredicateType {
    PredicateType::GreaterOrEqual
}

fn default_revocable() -> bool {
    true
}

fn default_capacity() -> u32 {
    100
}

fn default_ledger_start() -> i64 {
    DEFAULT_LEDGER_START
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            schema: SchemaSpec {
                name: "employee".into(),
                version: "1.0".into(),
                attributes: vec!["name".into(), "age".into(), "role".into()],
            },
            values: BTreeMap::from([
                ("name".into(), "Alice".into()),
                ("age".into(), "30".into()),
                ("role".into(), "engineer".into()),
            ]),
            reveal: BTreeMap::from([("name".into(), "Alice".into())]),
            predicates: vec![PredicateSpec {
                attribute: "age".into(),
                p_type: PredicateType::GreaterOrEqual,
                value: 18,
            }],
            revocable: true,
            capacity: default_capacity(),
            ledger_start: DEFAULT_LEDGER_START,
        }
    }
}

impl Scenario {
    /// Parse and check a YAML scenario.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(text).context("malformed scenario YAML")?;
        scenario.check()?;
        Ok(scenario)
    }

    /// Read a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario: {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in scenario {}", path.display()))
    }

    /// Values must cover the schema exactly, and every requested attribute
    /// must be one the schema defines.
    pub fn check(&self) -> Result<()> {
        let attrs: BTreeSet<&str> = self.schema.attributes.iter().map(String::as_str).collect();
        let given: BTreeSet<&str> = self.values.keys().map(String::as_str).collect();
        if attrs != given {
            bail!(
                "values {:?} do not match schema attributes {:?}",
                given,
                attrs
            );
        }
        let requested = self
            .reveal
            .keys()
            .chain(self.predicates.iter().map(|p| &p.attribute));
        for name in requested {
            if !attrs.contains(name.as_str()) {
                bail!("requested attribute \"{name}\" is not in the schema");
            }
        }
        if self.reveal.is_empty() && self.predicates.is_empty() {
            bail!("scenario requests nothing from the holder");
        }
        Ok(())
    }

    /// The issuer's proposal: raw values keyed by attribute name.
    pub fn proposal_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.values)?)
    }

    /// Add this scenario's attributes and predicates to a request.
    ///
    /// Referents are `attr_<name>` and `pred_<name>_<n>`.
    pub fn fill_request(&self, mut builder: ProofRequestBuilder) -> ProofRequestBuilder {
        for (name, expected) in &self.reveal {
            builder = builder.attribute(
                format!("attr_{name}"),
                CredentialFieldReference::new(name.clone()).with_value(expected.clone()),
            );
        }
        for (n, p) in self.predicates.iter().enumerate() {
            builder = builder.predicate(
                format!("pred_{}_{n}", p.attribute),
                CredentialPredicateReference {
                    name: p.attribute.clone(),
                    p_type: p.p_type,
                    p_value: p.value,
                    restrictions: Vec::new(),
                },
            );
        }
        builder
    }
}
