//! Work-permission resolution.
//!
//! The batch permission check does not take the same argument order on every
//! ILS deployment, and the order cannot be discovered without calling it. The
//! resolver probes an ordered list of candidate signatures and stops at the
//! first one whose answer yields at least one resolved permission.
//!
//! The order is a compatibility heuristic rather than a protocol guarantee,
//! so it lives in [`PermissionConfig::signatures`].
//!
//! An empty [`PermissionGrants`] means "could not determine"; callers must
//! deny by default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::event::{self, Event};
use crate::fieldmapper::parse_flag;
use crate::rpc::{AuthParam, RpcInvoker};

/// Service hosting the batch permission check.
pub const DEFAULT_PERM_SERVICE: &str = "open-ils.actor";
/// Batch permission check method.
pub const DEFAULT_PERM_METHOD: &str = "open-ils.actor.user.has_work_perm_at.batch";

/// Keys that may identify the permission in a list-of-objects answer.
const PERM_ID_KEYS: [&str; 3] = ["perm", "code", "name"];
/// Keys that may carry the grant in a list-of-objects answer.
const GRANT_KEYS: [&str; 4] = ["value", "allowed", "granted", "result"];

/// One candidate parameter layout for the batch check (auth token first in all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signature {
    /// `(auth, perms)`
    PermsOnly,
    /// `(auth, org, perms)`; requires an org.
    OrgThenPerms,
    /// `(auth, perms, org)`; requires an org.
    PermsThenOrg,
}

impl Signature {
    /// Parameters after the auth token, or `None` if this signature needs an
    /// org and none was supplied.
    fn params(self, perms: &[String], org_id: Option<i64>) -> Option<Vec<Value>> {
        let list = Value::Array(perms.iter().cloned().map(Value::String).collect());
        match (self, org_id) {
            (Signature::PermsOnly, _) => Some(vec![list]),
            (Signature::OrgThenPerms, Some(org)) => Some(vec![Value::from(org), list]),
            (Signature::PermsThenOrg, Some(org)) => Some(vec![list, Value::from(org)]),
            (_, None) => None,
        }
    }
}

/// Permission resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    pub service: String,
    pub method: String,
    /// Candidate signatures, tried in order.
    pub signatures: Vec<Signature>,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_PERM_SERVICE.to_string(),
            method: DEFAULT_PERM_METHOD.to_string(),
            signatures: vec![
                Signature::PermsOnly,
                Signature::OrgThenPerms,
                Signature::PermsThenOrg,
            ],
        }
    }
}

/// Permission code to grant, for one actor at one org unit.
///
/// Codes missing from the map are denied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionGrants(BTreeMap<String, bool>);

impl PermissionGrants {
    /// True only if the code was resolved and granted.
    pub fn is_granted(&self, code: &str) -> bool {
        self.0.get(code).copied().unwrap_or(false)
    }

    /// Resolved grant, `None` when undetermined.
    pub fn get(&self, code: &str) -> Option<bool> {
        self.0.get(code).copied()
    }

    /// True if every listed code is granted.
    pub fn all_granted<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        codes.iter().all(|code| self.is_granted(code.as_ref()))
    }

    pub fn any_granted<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        codes.iter().any(|code| self.is_granted(code.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(code, granted)| (code.as_str(), *granted))
    }

    pub fn into_inner(self) -> BTreeMap<String, bool> {
        self.0
    }
}

impl From<BTreeMap<String, bool>> for PermissionGrants {
    fn from(map: BTreeMap<String, bool>) -> Self {
        Self(map)
    }
}

/// Result of one candidate signature.
enum Probe {
    Resolved(PermissionGrants),
    Rejected(Event),
    /// The answer could not be read as grants; try the next signature.
    Ambiguous(&'static str),
}

/// Resolves batches of permission codes via the batch check method.
#[derive(Clone)]
pub struct PermissionResolver {
    invoker: RpcInvoker,
    config: PermissionConfig,
}

impl PermissionResolver {
    pub fn new(invoker: RpcInvoker, config: PermissionConfig) -> Self {
        Self { invoker, config }
    }

    pub fn config(&self) -> &PermissionConfig {
        &self.config
    }

    /// Resolve `perms` for the actor behind `auth_token`, optionally at `org_id`.
    ///
    /// Candidates run strictly in order; a later one is only called after the
    /// earlier ones failed. Events and unreadable answers move on to the next
    /// candidate, as does a method exception (bus status other than 200),
    /// since a wrong argument order often raises one. Any other transport
    /// error means the bus is unreachable and aborts the whole resolution. If
    /// no candidate resolves anything, the result is empty (deny everything).
    pub async fn resolve<S: AsRef<str>>(
        &self,
        auth_token: &str,
        org_id: Option<i64>,
        perms: &[S],
    ) -> Result<PermissionGrants> {
        let perms: Vec<String> = perms.iter().map(|p| p.as_ref().to_string()).collect();
        if perms.is_empty() {
            return Ok(PermissionGrants::default());
        }

        let auth = AuthParam::token(auth_token);
        for signature in &self.config.signatures {
            let Some(params) = signature.params(&perms, org_id) else {
                continue;
            };

            let response = match self
                .invoker
                .invoke(&auth, &self.config.service, &self.config.method, params)
                .await
            {
                Ok(response) => response,
                Err(err) if err.is_method_exception() => {
                    debug!(
                        signature = ?signature,
                        error = %err,
                        "Permission check raised for signature, trying next"
                    );
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            match probe(response.first(), &perms) {
                Probe::Resolved(grants) => {
                    debug!(
                        signature = ?signature,
                        resolved = grants.len(),
                        requested = perms.len(),
                        "Permissions resolved"
                    );
                    return Ok(grants);
                }
                Probe::Rejected(event) => {
                    debug!(
                        signature = ?signature,
                        code = event.code,
                        text_code = event.text_code.as_deref().unwrap_or(""),
                        "Permission check rejected signature, trying next"
                    );
                }
                Probe::Ambiguous(reason) => {
                    debug!(
                        signature = ?signature,
                        reason,
                        "Permission response ambiguous, trying next"
                    );
                }
            }
        }

        debug!(requested = perms.len(), "No signature resolved permissions");
        Ok(PermissionGrants::default())
    }
}

fn probe(result: Option<&Value>, perms: &[String]) -> Probe {
    let Some(value) = result else {
        return Probe::Ambiguous("empty payload");
    };
    if let Some(event) = event::classify(value) {
        return Probe::Rejected(event);
    }

    let grants = match value {
        Value::Array(items) if is_positional_answer(items, perms) => zip_positional(items, perms),
        Value::Array(items) => from_object_list(items, perms),
        Value::Object(obj) => from_keyed_object(obj, perms),
        _ => BTreeMap::new(),
    };

    if grants.is_empty() {
        Probe::Ambiguous("no permission resolved")
    } else {
        Probe::Resolved(grants.into())
    }
}

/// Same length as the request and no element is an object.
fn is_positional_answer(items: &[Value], perms: &[String]) -> bool {
    items.len() == perms.len() && items.iter().all(|item| !item.is_object())
}

fn zip_positional(items: &[Value], perms: &[String]) -> BTreeMap<String, bool> {
    perms
        .iter()
        .zip(items)
        .map(|(perm, value)| (perm.clone(), truthy(value)))
        .collect()
}

fn from_object_list(items: &[Value], perms: &[String]) -> BTreeMap<String, bool> {
    items
        .iter()
        .filter(|item| !event::is_event(item))
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            let perm = PERM_ID_KEYS
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_str))?;
            let granted = GRANT_KEYS.iter().find_map(|key| obj.get(*key))?;
            perms
                .iter()
                .any(|p| p == perm)
                .then(|| (perm.to_string(), truthy(granted)))
        })
        .collect()
}

fn from_keyed_object(obj: &Map<String, Value>, perms: &[String]) -> BTreeMap<String, bool> {
    perms
        .iter()
        .filter_map(|perm| obj.get(perm).map(|value| (perm.clone(), truthy(value))))
        .collect()
}

/// Grant truthiness of one answer element.
///
/// Wire booleans first; otherwise null and zero deny, lists grant when they
/// name at least one org unit, and strings grant unless empty or "false"/"0".
fn truthy(value: &Value) -> bool {
    if let Some(flag) = parse_flag(value) {
        return flag;
    }
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !matches!(s.trim(), "" | "0" | "false"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}
