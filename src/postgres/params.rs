use std::error::Error;

use chrono::{TimeZone, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, WrongType, to_sql_checked};
use tokio_util::bytes;

use super::{PostgresExtension, PostgresParam};

/// Borrow a parameter slice in the shape `tokio-postgres` expects.
pub(crate) fn param_refs(params: &[PostgresParam]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

/// Encode `value` only if its native type accepts the target column type.
fn checked<T: ToSql>(
    value: &T,
    ty: &Type,
    out: &mut bytes::BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    if !T::accepts(ty) {
        return Err(Box::new(WrongType::new::<T>(ty.clone())));
    }
    value.to_sql(ty, out)
}

impl ToSql for PostgresParam {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Bool(b) => checked(b, ty, out),
            // Integers narrow to the declared column width and fail instead of wrapping.
            Self::Int(i) => match *ty {
                Type::INT2 => checked(&i16::try_from(*i)?, ty, out),
                Type::INT4 => checked(&i32::try_from(*i)?, ty, out),
                Type::FLOAT8 => checked(&(*i as f64), ty, out),
                _ => checked(i, ty, out),
            },
            Self::Float(f) => match *ty {
                Type::FLOAT4 => checked(&(*f as f32), ty, out),
                _ => checked(f, ty, out),
            },
            Self::Text(s) => checked(s, ty, out),
            Self::Extension(PostgresExtension::Timestamp(ts)) => match *ty {
                Type::TIMESTAMPTZ => checked(&Utc.from_utc_datetime(ts), ty, out),
                _ => checked(ts, ty, out),
            },
            Self::Extension(PostgresExtension::Date(d)) => checked(d, ty, out),
            Self::Extension(PostgresExtension::Json(v)) => checked(v, ty, out),
            Self::Extension(PostgresExtension::Bytes(b)) => checked(b, ty, out),
        }
    }

    // Per-variant checks happen in `to_sql`, so NULL binds to any column type.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
