use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use mysql_async::{Params, Value};

use crate::error::SqlBridgeError;
use crate::types::Param;

use super::{MySqlExtension, MySqlParam};

/// Character set id MySQL reports for binary columns.
pub(crate) const BINARY_CHARSET: u16 = 63;

/// Encode one parameter for the binary protocol.
///
/// # Errors
///
/// Returns `SqlBridgeError::ParameterError` for datetimes whose year MySQL cannot represent.
pub fn to_mysql_value(param: &MySqlParam) -> Result<Value, SqlBridgeError> {
    Ok(match param {
        Param::Null => Value::NULL,
        Param::Bool(b) => Value::Int(i64::from(*b)),
        Param::Int(i) => Value::Int(*i),
        Param::Float(f) => Value::Double(*f),
        Param::Text(s) => Value::Bytes(s.clone().into_bytes()),
        Param::Extension(MySqlExtension::Bytes(b)) => Value::Bytes(b.clone()),
        Param::Extension(MySqlExtension::UInt(u)) => Value::UInt(*u),
        Param::Extension(MySqlExtension::DateTime(dt)) => datetime_value(dt)?,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn datetime_value(dt: &NaiveDateTime) -> Result<Value, SqlBridgeError> {
    let year = u16::try_from(dt.year()).map_err(|_| {
        SqlBridgeError::ParameterError(format!("mysql cannot store the year of {dt}"))
    })?;
    Ok(Value::Date(
        year,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
        dt.nanosecond() / 1_000,
    ))
}

pub(crate) fn to_mysql_params(params: &[MySqlParam]) -> Result<Params, SqlBridgeError> {
    if params.is_empty() {
        return Ok(Params::Empty);
    }
    Ok(Params::Positional(
        params.iter().map(to_mysql_value).collect::<Result<_, _>>()?,
    ))
}

/// Decode one result value. `binary` marks columns with the binary character set, whose bytes
/// stay raw instead of being read as UTF-8 text.
///
/// # Errors
///
/// Returns `SqlBridgeError::ConversionError` for text columns holding invalid UTF-8.
pub fn from_mysql_value(value: Value, binary: bool) -> Result<MySqlParam, SqlBridgeError> {
    Ok(match value {
        Value::NULL => Param::Null,
        Value::Int(i) => Param::Int(i),
        Value::UInt(u) => match i64::try_from(u) {
            Ok(i) => Param::Int(i),
            Err(_) => Param::Extension(MySqlExtension::UInt(u)),
        },
        Value::Float(f) => Param::Float(f64::from(f)),
        Value::Double(f) => Param::Float(f),
        Value::Bytes(bytes) if binary => Param::Extension(MySqlExtension::Bytes(bytes)),
        Value::Bytes(bytes) => Param::Text(String::from_utf8(bytes).map_err(|e| {
            SqlBridgeError::ConversionError(format!("mysql text column is not utf-8: {e}"))
        })?),
        // The zero date has no calendar value.
        Value::Date(0, 0, 0, 0, 0, 0, 0) => Param::Null,
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let dt = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
                .and_then(|date| {
                    date.and_hms_micro_opt(
                        u32::from(hour),
                        u32::from(minute),
                        u32::from(second),
                        micros,
                    )
                })
                .ok_or_else(|| {
                    SqlBridgeError::ConversionError(format!(
                        "mysql date {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02} \
                         is not a calendar value"
                    ))
                })?;
            Param::Extension(MySqlExtension::DateTime(dt))
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let hours = days * 24 + u32::from(hours);
            let mut text = format!("{sign}{hours:02}:{minutes:02}:{seconds:02}");
            if micros > 0 {
                text.push_str(&format!(".{micros:06}"));
            }
            Param::Text(text)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_binds_as_integer() {
        assert_eq!(to_mysql_value(&Param::Bool(true)).unwrap(), Value::Int(1));
        assert_eq!(to_mysql_value(&Param::Null).unwrap(), Value::NULL);
    }

    #[test]
    fn empty_params_are_empty() {
        assert_eq!(to_mysql_params(&[]).unwrap(), Params::Empty);
        assert_eq!(
            to_mysql_params(&[Param::Int(1), Param::from("a")]).unwrap(),
            Params::Positional(vec![Value::Int(1), Value::Bytes(b"a".to_vec())])
        );
    }

    #[test]
    fn large_unsigned_values_keep_their_range() {
        assert_eq!(from_mysql_value(Value::UInt(5), false).unwrap(), Param::Int(5));
        assert_eq!(
            from_mysql_value(Value::UInt(u64::MAX), false).unwrap(),
            Param::Extension(MySqlExtension::UInt(u64::MAX))
        );
    }

    #[test]
    fn bytes_follow_the_column_charset() {
        assert_eq!(
            from_mysql_value(Value::Bytes(b"abc".to_vec()), false).unwrap(),
            Param::Text("abc".into())
        );
        assert_eq!(
            from_mysql_value(Value::Bytes(vec![0xff]), true).unwrap(),
            Param::Extension(MySqlExtension::Bytes(vec![0xff]))
        );
        assert!(from_mysql_value(Value::Bytes(vec![0xff]), false).is_err());
    }

    #[test]
    fn dates_round_trip_and_zero_dates_are_null() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_micro_opt(13, 5, 9, 250)
            .unwrap();
        let value = to_mysql_value(&Param::Extension(MySqlExtension::DateTime(dt))).unwrap();
        assert_eq!(
            from_mysql_value(value, false).unwrap(),
            Param::Extension(MySqlExtension::DateTime(dt))
        );
        assert_eq!(
            from_mysql_value(Value::Date(0, 0, 0, 0, 0, 0, 0), false).unwrap(),
            Param::Null
        );
    }

    #[test]
    fn impossible_dates_are_conversion_errors() {
        let err = from_mysql_value(Value::Date(2023, 2, 30, 0, 0, 0, 0), false).unwrap_err();
        assert!(matches!(err, SqlBridgeError::ConversionError(_)), "{err}");
        let err = from_mysql_value(Value::Date(2023, 0, 0, 0, 0, 0, 0), false).unwrap_err();
        assert!(matches!(err, SqlBridgeError::ConversionError(_)), "{err}");
    }

    #[test]
    fn years_outside_mysql_range_are_rejected() {
        let ides = NaiveDate::from_ymd_opt(-44, 3, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let param = Param::Extension(MySqlExtension::DateTime(ides));
        let err = to_mysql_value(&param).unwrap_err();
        assert!(matches!(err, SqlBridgeError::ParameterError(_)), "{err}");

        let err = to_mysql_params(&[Param::Int(1), param]).unwrap_err();
        assert!(matches!(err, SqlBridgeError::ParameterError(_)), "{err}");
    }

    #[test]
    fn time_values_render_as_text() {
        assert_eq!(
            from_mysql_value(Value::Time(true, 1, 2, 3, 4, 0), false).unwrap(),
            Param::Text("-26:03:04".into())
        );
    }
}
