//! Newtype IDs for type-safe entity references.
//!
//! Every table in the storefront and commerce schemas uses a `SERIAL`
//! primary key. Wrapping those keys in distinct types keeps an order id from
//! being passed where a variant id is expected.

/// Macro to define a type-safe ID wrapper around an `i32` primary key.
///
/// The generated type is `Copy`, serializes transparently, parses from a
/// decimal string (for path segments and CLI arguments) and, with the
/// `postgres` feature, binds and decodes as `INT4`.
///
/// # Example
///
/// ```rust
/// # use velvet_haze_core::define_id;
/// define_id!(WarehouseId);
///
/// let id: WarehouseId = "42".parse().unwrap();
/// assert_eq!(id.as_i32(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw primary key.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw primary key.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Storefront identities
define_id!(UserId);

// Commerce schema
define_id!(ProductId);
define_id!(VariantId);
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(RestockSubscriptionId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_path_segment() {
        let id: OrderId = " 1017 ".parse().unwrap();
        assert_eq!(id, OrderId::new(1017));
        assert!("abc".parse::<OrderId>().is_err());
    }

    #[test]
    fn test_serializes_transparently() {
        let json = serde_json::to_string(&VariantId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: VariantId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_i32(), 7);
    }

    #[test]
    fn test_ordering_follows_raw_key() {
        assert!(OrderId::new(1) < OrderId::new(2));
    }
}
