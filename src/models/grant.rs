//! Shared-access grants: signed URIs that let another service act on a
//! single blob without holding the account key.

use chrono::{DateTime, Utc};
use std::fmt;
use url::Url;

/// An operation a signed URI may be presented for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlobOperation {
    Read,
    Add,
    Create,
    Write,
    Delete,
    List,
}

/// Permission set carried in the `sp` query parameter.
///
/// Encoded in the canonical order `racwdl`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SasPermissions {
    pub read: bool,
    pub add: bool,
    pub create: bool,
    pub write: bool,
    pub delete: bool,
    pub list: bool,
}

impl SasPermissions {
    pub const fn read_only() -> Self {
        Self {
            read: true,
            add: false,
            create: false,
            write: false,
            delete: false,
            list: false,
        }
    }

    pub fn is_read_only(&self) -> bool {
        *self == Self::read_only()
    }

    pub fn allows(&self, op: BlobOperation) -> bool {
        match op {
            BlobOperation::Read => self.read,
            BlobOperation::Add => self.add,
            BlobOperation::Create => self.create,
            BlobOperation::Write => self.write,
            BlobOperation::Delete => self.delete,
            BlobOperation::List => self.list,
        }
    }

    /// Parse an `sp` value. Letters must appear in canonical order and at
    /// most once.
    pub fn parse(value: &str) -> Option<Self> {
        let mut perms = Self::default();
        let mut rest = value;
        for (letter, slot) in [
            ('r', &mut perms.read),
            ('a', &mut perms.add),
            ('c', &mut perms.create),
            ('w', &mut perms.write),
            ('d', &mut perms.delete),
            ('l', &mut perms.list),
        ] {
            if let Some(stripped) = rest.strip_prefix(letter) {
                *slot = true;
                rest = stripped;
            }
        }
        if rest.is_empty() && perms != Self::default() {
            Some(perms)
        } else {
            None
        }
    }
}

impl fmt::Display for SasPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, set) in [
            ('r', self.read),
            ('a', self.add),
            ('c', self.create),
            ('w', self.write),
            ('d', self.delete),
            ('l', self.list),
        ] {
            if set {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

/// A time-bounded grant scoped to exactly one blob.
#[derive(Clone, Debug)]
pub struct SignedAccessGrant {
    /// Blob URI with the signature embedded in its query string.
    pub uri: Url,
    pub account: String,
    pub container: String,
    pub blob: String,
    pub permissions: SasPermissions,
    pub expires_on: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissions_display_in_canonical_order() {
        let perms = SasPermissions {
            read: true,
            write: true,
            list: true,
            ..Default::default()
        };
        assert_eq!(perms.to_string(), "rwl");
        assert_eq!(SasPermissions::parse("rwl"), Some(perms));
    }

    #[test]
    fn parse_rejects_out_of_order_or_unknown_letters() {
        assert_eq!(SasPermissions::parse("wr"), None);
        assert_eq!(SasPermissions::parse("rx"), None);
        assert_eq!(SasPermissions::parse(""), None);
        assert_eq!(SasPermissions::parse("rr"), None);
    }

    #[test]
    fn read_only_allows_nothing_but_read() {
        let perms = SasPermissions::read_only();
        assert!(perms.is_read_only());
        assert!(perms.allows(BlobOperation::Read));
        for op in [
            BlobOperation::Add,
            BlobOperation::Create,
            BlobOperation::Write,
            BlobOperation::Delete,
            BlobOperation::List,
        ] {
            assert!(!perms.allows(op), "{op:?} should be denied");
        }
    }
}
