//! Identifiers for the named things in a model: thermal generators and batteries.
use anyhow::{Result, bail};
use itertools::Itertools;
use std::fmt::Display;
use std::hash::Hash;

macro_rules! define_id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub std::rc::Rc<str>);

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                Self(id.into())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s.into())
            }
        }
    };
}

define_id_type!(
    /// The name of a thermal generator, as given in the generator roster
    GeneratorID
);
define_id_type!(
    /// The name of a battery in the heuristic dispatcher
    BatteryID
);

/// Something which is identified by an ID
pub trait HasID<ID> {
    /// Get the item's ID
    fn get_id(&self) -> &ID;
}

/// Implement [`HasID`] for a type with a field called `id`
macro_rules! define_id_getter {
    ($t:ty, $id_ty:ty) => {
        impl crate::id::HasID<$id_ty> for $t {
            fn get_id(&self) -> &$id_ty {
                &self.id
            }
        }
    };
}
pub(crate) use define_id_getter;

/// Check that no two items share an ID.
///
/// `kind` describes the items (e.g. "generator") in the error message.
pub fn check_ids_unique<'a, ID, T, I>(items: I, kind: &str) -> Result<()>
where
    I: IntoIterator<Item = &'a T>,
    ID: Eq + Hash + Display + 'a,
    T: HasID<ID> + 'a,
{
    if let Some(id) = items.into_iter().map(|item| item.get_id()).duplicates().next() {
        bail!("Duplicate {kind} ID: {id}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        id: GeneratorID,
    }
    define_id_getter! {Item, GeneratorID}

    #[test]
    fn test_check_ids_unique() {
        let items = [Item { id: "a".into() }, Item { id: "b".into() }];
        assert!(check_ids_unique(&items, "generator").is_ok());

        let items = [
            Item { id: "a".into() },
            Item { id: "b".into() },
            Item { id: "a".into() },
        ];
        assert_eq!(
            check_ids_unique(&items, "generator")
                .unwrap_err()
                .to_string(),
            "Duplicate generator ID: a"
        );
    }

    #[test]
    fn test_id_display() {
        let id = BatteryID::from(format!("Battery {}", 2));
        assert_eq!(id.to_string(), "Battery 2");
        assert_eq!(id, BatteryID::new("Battery 2"));
    }
}
