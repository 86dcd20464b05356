//! Typed Uuids
//!
//! Every aggregate is addressed by a UUIDv7 tagged with the type it identifies,
//! so an order id can never be passed where a product id is expected.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    hash::{Hash, Hasher},
    marker::PhantomData,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// A [`Uuid`] tagged with the entity type it identifies.
pub struct TypedUuid<T>(Uuid, PhantomData<T>);

impl<T> TypedUuid<T> {
    /// Generate a fresh, time-ordered identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::from_uuid(Uuid::now_v7())
    }

    /// Wrap an existing [`Uuid`].
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid, PhantomData)
    }

    /// Unwrap into the untyped [`Uuid`].
    #[must_use]
    pub const fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl<T> Default for TypedUuid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for TypedUuid<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedUuid<T> {}

impl<T> Debug for TypedUuid<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Debug::fmt(&self.0, f)
    }
}

impl<T> Display for TypedUuid<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

impl<T> PartialEq for TypedUuid<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for TypedUuid<T> {}

impl<T> Hash for TypedUuid<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> PartialOrd for TypedUuid<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for TypedUuid<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> From<Uuid> for TypedUuid<T> {
    fn from(value: Uuid) -> Self {
        Self::from_uuid(value)
    }
}

impl<T> From<TypedUuid<T>> for Uuid {
    fn from(value: TypedUuid<T>) -> Self {
        value.into_uuid()
    }
}

impl<T> Serialize for TypedUuid<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for TypedUuid<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Self::from_uuid)
    }
}

/// Buyer account (owned by the external identity service).
#[derive(Debug)]
pub struct User;

/// Seller storefront.
#[derive(Debug)]
pub struct Seller;

/// Catalog category.
#[derive(Debug)]
pub struct Category;

/// Marketplace administrator.
#[derive(Debug)]
pub struct Admin;

/// Buyer UUID
pub type UserUuid = TypedUuid<User>;

/// Seller UUID
pub type SellerUuid = TypedUuid<Seller>;

/// Category UUID
pub type CategoryUuid = TypedUuid<Category>;

/// Admin UUID
pub type AdminUuid = TypedUuid<Admin>;

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn new_ids_are_version_seven() {
        let first = SellerUuid::new();
        let second = SellerUuid::new();

        assert_eq!(first.into_uuid().get_version_num(), 7);
        assert_ne!(first, second, "fresh ids should never collide");
    }

    #[test]
    fn serializes_as_a_bare_uuid() -> TestResult {
        let uuid = Uuid::now_v7();
        let typed = UserUuid::from_uuid(uuid);

        assert_eq!(serde_json::to_string(&typed)?, format!("\"{uuid}\""));

        let parsed: UserUuid = serde_json::from_str(&format!("\"{uuid}\""))?;

        assert_eq!(parsed, typed);

        Ok(())
    }
}
