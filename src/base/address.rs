//! Chat addresses (`local@domain/resource`).
//!
//! Addresses arrive as plain strings from the session layer. Everything that needs the
//! bare or resource part goes through [`Jid::parse`] so a malformed sender surfaces as an
//! [`AddressError`] instead of a silently wrong recipient.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Errors produced while parsing an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("address `{0}` has an empty local part")]
    EmptyLocalpart(String),
    #[error("address `{0}` has an empty domain")]
    EmptyDomain(String),
    #[error("address `{0}` has an empty resource")]
    EmptyResource(String),
    #[error("address `{address}` contains invalid character {found:?}")]
    InvalidCharacter { address: String, found: char },
}

/// A parsed chat address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Jid {
    local: Option<String>,
    domain: String,
    resource: Option<String>,
}

impl Jid {
    /// Parse an address of the form `[local@]domain[/resource]`.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        if input.is_empty() {
            return Err(AddressError::Empty);
        }

        if let Some(found) = input.chars().find(|c| c.is_whitespace()) {
            return Err(AddressError::InvalidCharacter { address: input.to_string(), found });
        }

        // The resource may itself contain `@` and `/`, so split it off first.
        let (head, resource) = match input.split_once('/') {
            Some((head, resource)) => {
                if resource.is_empty() {
                    return Err(AddressError::EmptyResource(input.to_string()));
                }
                (head, Some(resource.to_string()))
            }
            None => (input, None),
        };

        let (local, domain) = match head.split_once('@') {
            Some((local, domain)) => {
                if local.is_empty() {
                    return Err(AddressError::EmptyLocalpart(input.to_string()));
                }
                (Some(local.to_string()), domain)
            }
            None => (None, head),
        };

        if domain.is_empty() {
            return Err(AddressError::EmptyDomain(input.to_string()));
        }

        if domain.contains('@') {
            return Err(AddressError::InvalidCharacter { address: input.to_string(), found: '@' });
        }

        Ok(Self {
            local,
            domain: domain.to_string(),
            resource,
        })
    }

    pub fn local(&self) -> Option<&str> {
        self.local.as_deref()
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn is_bare(&self) -> bool {
        self.resource.is_none()
    }

    /// The address without its resource part.
    pub fn bare(&self) -> Jid {
        Jid {
            local: self.local.clone(),
            domain: self.domain.clone(),
            resource: None,
        }
    }

    /// Attach (or replace) the resource part.
    pub fn with_resource(&self, resource: impl Into<String>) -> Jid {
        Jid {
            local: self.local.clone(),
            domain: self.domain.clone(),
            resource: Some(resource.into()),
        }
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(local) = &self.local {
            write!(f, "{local}@")?;
        }

        write!(f, "{}", self.domain)?;

        if let Some(resource) = &self.resource {
            write!(f, "/{resource}")?;
        }

        Ok(())
    }
}

impl FromStr for Jid {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Jid::parse(s)
    }
}

// Tests.
