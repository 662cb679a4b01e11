// Enums stored as their upper-case names in TEXT columns.
// Fulfills diesel traits; serde is derived on the enums themselves.

/// Implements `ToSql<Text, Pg>` and `FromSql<Text, Pg>` for a type with
/// `as_str()` and a `FromStr` impl whose error converts into a boxed error.
macro_rules! text_column {
    ($ty:ty) => {
        impl diesel::serialize::ToSql<diesel::sql_types::Text, diesel::pg::Pg>
            for $ty
        {
            fn to_sql<W: std::io::Write>(
                &self,
                out: &mut diesel::serialize::Output<W, diesel::pg::Pg>,
            ) -> diesel::serialize::Result {
                <str as diesel::serialize::ToSql<
                    diesel::sql_types::Text,
                    diesel::pg::Pg,
                >>::to_sql(self.as_str(), out)
            }
        }

        impl diesel::deserialize::FromSql<diesel::sql_types::Text, diesel::pg::Pg>
            for $ty
        {
            fn from_sql(
                bytes: Option<&[u8]>,
            ) -> diesel::deserialize::Result<Self> {
                let raw = <String as diesel::deserialize::FromSql<
                    diesel::sql_types::Text,
                    diesel::pg::Pg,
                >>::from_sql(bytes)?;
                raw.parse::<$ty>().map_err(|e| e.into())
            }
        }
    };
}
