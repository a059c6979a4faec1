//! Recipient resolution.
//!
//! Builds the set of addresses a notification goes to from three sources, in
//! this order: the admin allow-list, approved users, and addresses carried by
//! the event itself. Duplicates across sources are dropped, keeping the first
//! occurrence, so iteration order is deterministic.

use crate::error::{ApiError, ValidationError};
use crate::notify::event::Event;
use crate::store::UserDirectory;
use std::collections::HashSet;
use std::sync::Arc;

/// Addresses authorized for privileged operations. Loaded once at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    addresses: Vec<String>,
}

impl AdminAllowList {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let addresses = addresses
            .into_iter()
            .map(Into::into)
            .map(|a: String| a.trim().to_string())
            .filter(|a| !a.is_empty() && seen.insert(a.clone()))
            .collect();
        Self { addresses }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.iter().any(|a| a == address)
    }

    /// Checks that the caller-supplied address is an admin.
    pub fn authorize(&self, admin_email: Option<&str>) -> Result<(), ApiError> {
        match admin_email {
            Some(email) if self.contains(email) => Ok(()),
            _ => Err(ApiError::Unauthorized(
                "Not authorized - admin email required".into(),
            )),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.addresses.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Unique addresses in first-insertion order. Case-sensitive, no normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecipientSet {
    ordered: Vec<String>,
    seen: HashSet<String>,
}

impl RecipientSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an address unless it is blank or already present. Returns whether
    /// the set grew.
    pub fn insert(&mut self, address: &str) -> bool {
        if address.trim().is_empty() || self.seen.contains(address) {
            return false;
        }
        self.seen.insert(address.to_string());
        self.ordered.push(address.to_string());
        true
    }

    pub fn contains(&self, address: &str) -> bool {
        self.seen.contains(address)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for RecipientSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = RecipientSet::new();
        for address in iter {
            set.insert(address);
        }
        set
    }
}

impl IntoIterator for RecipientSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.into_iter()
    }
}

/// Produces the authoritative [`RecipientSet`] for an event.
#[derive(Clone)]
pub struct RecipientResolver {
    admins: Arc<AdminAllowList>,
    users: Arc<dyn UserDirectory>,
}

impl RecipientResolver {
    pub fn new(admins: Arc<AdminAllowList>, users: Arc<dyn UserDirectory>) -> Self {
        Self { admins, users }
    }

    /// Resolves the recipients of `event`.
    ///
    /// Only a malformed event is an error. If the user directory cannot be
    /// reached the failure is logged and resolution carries on with the admin
    /// and inline addresses.
    #[tracing::instrument(skip_all, fields(kind = event.kind()))]
    pub async fn resolve(&self, event: &Event) -> Result<RecipientSet, ValidationError> {
        event.validate()?;

        let mut recipients: RecipientSet = self.admins.iter().collect();

        match self.users.approved_users().await {
            Ok(users) => {
                tracing::debug!(count = users.len(), "Fetched approved users");
                for user in &users {
                    recipients.insert(&user.email);
                }
            }
            Err(e) => {
                tracing::warn!(
                    name = "notify.resolve.user_lookup_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    error = %e,
                    message = "Could not fetch approved users, continuing with remaining sources"
                );
            }
        }

        for address in event.inline_addresses() {
            recipients.insert(address);
        }

        if recipients.is_empty() {
            tracing::info!("Event resolved to zero recipients");
        }
        Ok(recipients)
    }
}
