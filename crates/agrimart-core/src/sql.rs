//! SQLite codecs for the decimal value types.
//!
//! `Money` and `Percent` are stored as TEXT (`"999.995"`) so that no
//! precision is lost to SQLite's REAL affinity. Arithmetic on these columns
//! happens in Rust, never in SQL.

use rust_decimal::Decimal;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{Sqlite, SqliteTypeInfo};
use sqlx::{Database, Decode, Encode, Type};

use crate::money::Money;
use crate::types::Percent;

fn decode_decimal<'r>(value: <Sqlite as Database>::ValueRef<'r>) -> Result<Decimal, BoxDynError> {
    let text = <&str as Decode<'r, Sqlite>>::decode(value)?;
    Ok(Decimal::from_str_exact(text.trim())?)
}

// =============================================================================
// Money
// =============================================================================

impl Type<Sqlite> for Money {
    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Sqlite> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        <String as Encode<'q, Sqlite>>::encode(self.amount().to_string(), buf)
    }
}

impl<'r> Decode<'r, Sqlite> for Money {
    fn decode(value: <Sqlite as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
        decode_decimal(value).map(Money::new)
    }
}

// =============================================================================
// Percent
// =============================================================================

impl Type<Sqlite> for Percent {
    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Sqlite> for Percent {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, BoxDynError> {
        <String as Encode<'q, Sqlite>>::encode(self.as_decimal().to_string(), buf)
    }
}

impl<'r> Decode<'r, Sqlite> for Percent {
    fn decode(value: <Sqlite as Database>::ValueRef<'r>) -> Result<Self, BoxDynError> {
        Ok(Percent::new(decode_decimal(value)?)?)
    }
}
