//! Claims model and the inbound/outbound claim-type translation tables.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use serde_json::Value;

/// Canonical (long-form) claim type URIs.
pub mod claim_types {
    /// Subject identifier.
    pub const NAME_IDENTIFIER: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";
    /// Display name.
    pub const NAME: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";
    /// Email address.
    pub const EMAIL: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";
    /// Given name.
    pub const GIVEN_NAME: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname";
    /// Surname.
    pub const SURNAME: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/surname";
    /// Role membership.
    pub const ROLE: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";
    /// Delegated actor.
    pub const ACTOR: &str = "http://schemas.xmlsoap.org/ws/2009/09/identity/claims/actor";
    /// Birth date.
    pub const DATE_OF_BIRTH: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/dateofbirth";
}

/// Claim property key holding the original wire name of a claim whose
/// type was rewritten by the inbound map. The outbound map consults it
/// so a projected claim round-trips to its original name.
pub const SHORT_CLAIM_TYPE_PROPERTY: &str = "sentinel/claims/short-type-name";

static DEFAULT_INBOUND: Lazy<HashMap<String, String>> = Lazy::new(|| {
    [
        ("sub", claim_types::NAME_IDENTIFIER),
        ("unique_name", claim_types::NAME),
        ("email", claim_types::EMAIL),
        ("given_name", claim_types::GIVEN_NAME),
        ("family_name", claim_types::SURNAME),
        ("birthdate", claim_types::DATE_OF_BIRTH),
        ("role", claim_types::ROLE),
        ("roles", claim_types::ROLE),
        ("actort", claim_types::ACTOR),
    ]
    .into_iter()
    .map(|(short, long)| (short.to_string(), long.to_string()))
    .collect()
});

static DEFAULT_OUTBOUND: Lazy<HashMap<String, String>> = Lazy::new(|| {
    [
        (claim_types::NAME_IDENTIFIER, "sub"),
        (claim_types::NAME, "unique_name"),
        (claim_types::EMAIL, "email"),
        (claim_types::GIVEN_NAME, "given_name"),
        (claim_types::SURNAME, "family_name"),
        (claim_types::DATE_OF_BIRTH, "birthdate"),
        (claim_types::ROLE, "role"),
        (claim_types::ACTOR, "actort"),
    ]
    .into_iter()
    .map(|(long, short)| (long.to_string(), short.to_string()))
    .collect()
});

/// Translation tables applied during claims projection.
///
/// All three tables are per-handler state; replacing them affects only
/// the handler they are installed on.
#[derive(Debug, Clone)]
pub struct ClaimTypeMaps {
    /// Wire name to canonical type, applied when projecting inbound.
    pub inbound: HashMap<String, String>,
    /// Canonical type to wire name, applied when writing outbound.
    pub outbound: HashMap<String, String>,
    /// Wire names dropped entirely during inbound projection.
    pub inbound_filter: HashSet<String>,
}

impl Default for ClaimTypeMaps {
    fn default() -> Self {
        Self {
            inbound: DEFAULT_INBOUND.clone(),
            outbound: DEFAULT_OUTBOUND.clone(),
            inbound_filter: HashSet::new(),
        }
    }
}

impl ClaimTypeMaps {
    /// Tables that pass every claim through untranslated.
    pub fn identity() -> Self {
        Self {
            inbound: HashMap::new(),
            outbound: HashMap::new(),
            inbound_filter: HashSet::new(),
        }
    }
}

/// A single statement about a subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Claim {
    claim_type: String,
    value: Value,
    issuer: String,
    properties: HashMap<String, String>,
}

impl Claim {
    /// A claim with no issuer attribution.
    pub fn new(claim_type: impl Into<String>, value: Value) -> Self {
        Self {
            claim_type: claim_type.into(),
            value,
            issuer: String::new(),
            properties: HashMap::new(),
        }
    }

    /// A claim attributed to a validated issuer.
    pub fn with_issuer(
        claim_type: impl Into<String>,
        value: Value,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            claim_type: claim_type.into(),
            value,
            issuer: issuer.into(),
            properties: HashMap::new(),
        }
    }

    /// The claim type, after any inbound translation.
    pub fn claim_type(&self) -> &str {
        &self.claim_type
    }

    /// The claim value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The value as a string, if it is one.
    pub fn value_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// The issuer this claim was validated against.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Claim properties, such as the stashed original wire name.
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Attach a property.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    /// The wire name this claim should be written back under: the
    /// stashed original name if the inbound map rewrote it, otherwise
    /// the claim type itself.
    pub fn original_name(&self) -> &str {
        self.properties
            .get(SHORT_CLAIM_TYPE_PROPERTY)
            .map(String::as_str)
            .unwrap_or(&self.claim_type)
    }
}

/// A set of claims describing one subject, with optional delegation.
#[derive(Debug, Clone, Default)]
pub struct ClaimsIdentity {
    claims: Vec<Claim>,
    actor: Option<Box<ClaimsIdentity>>,
    bootstrap_token: Option<String>,
}

impl ClaimsIdentity {
    /// An identity with no claims.
    pub fn new() -> Self {
        Self::default()
    }

    /// An identity from a list of claims.
    pub fn from_claims(claims: impl IntoIterator<Item = Claim>) -> Self {
        Self {
            claims: claims.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Append a claim.
    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// All claims, in projection order.
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// The first claim of the given type.
    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.claim_type() == claim_type)
    }

    /// All claims of the given type.
    pub fn find_all<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a Claim> {
        self.claims
            .iter()
            .filter(move |c| c.claim_type() == claim_type)
    }

    /// The delegated identity, if one was projected.
    pub fn actor(&self) -> Option<&ClaimsIdentity> {
        self.actor.as_deref()
    }

    /// Install the delegated identity.
    pub fn set_actor(&mut self, actor: ClaimsIdentity) {
        self.actor = Some(Box::new(actor));
    }

    /// The raw token this identity was projected from, when the caller
    /// asked for it to be retained.
    pub fn bootstrap_token(&self) -> Option<&str> {
        self.bootstrap_token.as_deref()
    }

    /// Retain the raw token on the identity.
    pub fn set_bootstrap_token(&mut self, token: impl Into<String>) {
        self.bootstrap_token = Some(token.into());
    }
}

/// The outcome of a successful validation: one identity per token.
#[derive(Debug, Clone, Default)]
pub struct ClaimsPrincipal {
    identities: Vec<ClaimsIdentity>,
}

impl ClaimsPrincipal {
    /// A principal holding a single identity.
    pub fn from_identity(identity: ClaimsIdentity) -> Self {
        Self {
            identities: vec![identity],
        }
    }

    /// All identities.
    pub fn identities(&self) -> &[ClaimsIdentity] {
        &self.identities
    }

    /// The primary identity.
    pub fn primary(&self) -> Option<&ClaimsIdentity> {
        self.identities.first()
    }

    /// The first claim of the given type across all identities.
    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.identities
            .iter()
            .find_map(|identity| identity.find_first(claim_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn original_name_prefers_the_stashed_wire_name() {
        let mut claim = Claim::new(claim_types::EMAIL, json!("a@b.example"));
        assert_eq!(claim.original_name(), claim_types::EMAIL);

        claim.set_property(SHORT_CLAIM_TYPE_PROPERTY, "email");
        assert_eq!(claim.original_name(), "email");
    }

    #[test]
    fn default_maps_are_inverses_over_the_mapped_set() {
        let maps = ClaimTypeMaps::default();
        for (long, short) in &maps.outbound {
            assert_eq!(maps.inbound.get(short.as_str()), Some(long));
        }
    }

    #[test]
    fn find_first_and_find_all_respect_order() {
        let identity = ClaimsIdentity::from_claims([
            Claim::new(claim_types::ROLE, json!("reader")),
            Claim::new(claim_types::ROLE, json!("writer")),
            Claim::new(claim_types::NAME, json!("riley")),
        ]);

        assert_eq!(
            identity.find_first(claim_types::ROLE).unwrap().value_str(),
            Some("reader")
        );
        assert_eq!(identity.find_all(claim_types::ROLE).count(), 2);
    }
}
