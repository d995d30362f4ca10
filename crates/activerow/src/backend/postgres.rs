//! PostgreSQL backend over `tokio-postgres`.

use super::placeholder::number_placeholders;
use crate::client::{Connection, RowStream};
use crate::error::{OrmError, OrmResult};
use crate::record::Record;
use crate::value::Value;
use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::StreamExt;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::error::Error;
use std::str::FromStr;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, NoTls, Row};

type BoxError = Box<dyn Error + Sync + Send>;

/// Connect without TLS and drive the connection on a background task.
pub async fn connect(url: &str) -> OrmResult<Client> {
    let (client, connection) = tokio_postgres::connect(url, NoTls).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(target: "activerow.postgres", error = %e, "connection closed with error");
        }
    });
    Ok(client)
}

fn is_text(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    )
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, BoxError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN)))
        .map_err(|e| format!("invalid timestamp {s:?}: {e}").into())
}

fn parse_timestamptz(s: &str) -> Result<DateTime<Utc>, BoxError> {
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => parse_timestamp(s).map(|naive| naive.and_utc()),
    }
}

fn parse_bool(s: &str) -> Result<bool, BoxError> {
    match s {
        "t" | "true" | "TRUE" | "1" | "y" | "yes" | "on" => Ok(true),
        "f" | "false" | "FALSE" | "0" | "n" | "no" | "off" => Ok(false),
        _ => Err(format!("invalid boolean {s:?}").into()),
    }
}

/// Parameters are narrowed to the type the server inferred for each placeholder,
/// so an `Int` can bind to `int2`, `int4`, `int8`, `numeric` or a float column.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::INT2 => i16::from(*b).to_sql(ty, out),
                Type::INT4 => i32::from(*b).to_sql(ty, out),
                Type::INT8 => i64::from(*b).to_sql(ty, out),
                _ if is_text(ty) => b.to_string().to_sql(ty, out),
                _ => Err(format!("cannot bind bool to {ty}").into()),
            },
            Value::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::INT8 => i.to_sql(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 => (*i as f32).to_sql(ty, out),
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                Type::BOOL => (*i != 0).to_sql(ty, out),
                _ if is_text(ty) => i.to_string().to_sql(ty, out),
                _ => Err(format!("cannot bind integer to {ty}").into()),
            },
            Value::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::FLOAT8 => f.to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*f)?.to_sql(ty, out),
                _ if is_text(ty) => f.to_string().to_sql(ty, out),
                _ => Err(format!("cannot bind float to {ty}").into()),
            },
            Value::Text(s) => match *ty {
                _ if is_text(ty) => s.as_str().to_sql(ty, out),
                Type::INT2 => s.trim().parse::<i16>()?.to_sql(ty, out),
                Type::INT4 => s.trim().parse::<i32>()?.to_sql(ty, out),
                Type::INT8 => s.trim().parse::<i64>()?.to_sql(ty, out),
                Type::FLOAT4 => s.trim().parse::<f32>()?.to_sql(ty, out),
                Type::FLOAT8 => s.trim().parse::<f64>()?.to_sql(ty, out),
                Type::NUMERIC => Decimal::from_str(s.trim())?.to_sql(ty, out),
                Type::BOOL => parse_bool(s.trim())?.to_sql(ty, out),
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
                }
                Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
                Type::TIMESTAMPTZ => parse_timestamptz(s)?.to_sql(ty, out),
                Type::DATE => NaiveDate::parse_from_str(s, "%Y-%m-%d")?.to_sql(ty, out),
                Type::TIME => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")?.to_sql(ty, out),
                _ => Err(format!("cannot bind text to {ty}").into()),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn decode_column(row: &Row, idx: usize) -> OrmResult<Value> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let err = |e: tokio_postgres::Error| OrmError::decode(column.name(), e.to_string());

    let value: Value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map_err(err)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx).map_err(err)?.into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).map_err(err)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(err)?.into(),
        Type::OID => row.try_get::<_, Option<u32>>(idx).map_err(err)?.into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).map_err(err)?.into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(err)?.into(),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(idx)
            .map_err(err)?
            .map(|d| d.to_f64().map_or_else(|| Value::Text(d.to_string()), Value::Float))
            .unwrap_or(Value::Null),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(err)?
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            .into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map_err(err)?
            .map(|ts| ts.to_rfc3339())
            .into(),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)
            .map_err(err)?
            .map(|d| d.to_string())
            .into(),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)
            .map_err(err)?
            .map(|t| t.to_string())
            .into(),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .map_err(err)?
            .map(|j| j.to_string())
            .into(),
        _ => row.try_get::<_, Option<String>>(idx).map_err(err)?.into(),
    };
    Ok(value)
}

fn decode_row(row: &Row) -> OrmResult<Record> {
    let mut record = Record::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        record.set(column.name(), decode_column(row, idx)?);
    }
    Ok(record)
}

/// `?` placeholders are numbered to `$n`; literal `?` operators are written `??`.
#[async_trait]
impl Connection for Client {
    fn driver_name(&self) -> &str {
        "pgsql"
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<RowStream> {
        let sql = number_placeholders(sql);
        let stmt = self.prepare(&sql).await?;
        let rows = self.query_raw(&stmt, params.iter()).await?;
        Ok(RowStream::new(rows.map(|row| decode_row(&row?))))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let sql = number_placeholders(sql);
        let refs = params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect::<Vec<_>>();
        Ok(Client::execute(self, &*sql, &refs).await?)
    }

    async fn last_insert_id(&self) -> OrmResult<Option<Value>> {
        match self.query_one("SELECT lastval()", &[]).await {
            Ok(row) => Ok(Some(Value::Int(row.try_get::<_, i64>(0)?))),
            Err(e) if e.code() == Some(&SqlState::OBJECT_NOT_IN_PREREQUISITE_STATE) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &Value, ty: &Type) -> Result<(IsNull, Vec<u8>), BoxError> {
        let mut buf = BytesMut::new();
        let is_null = value.to_sql(ty, &mut buf)?;
        Ok((is_null, buf.to_vec()))
    }

    #[test]
    fn int_narrows_to_column_width() {
        let (_, bytes) = encode(&Value::Int(7), &Type::INT4).unwrap();
        assert_eq!(bytes, 7i32.to_be_bytes());
        let (_, bytes) = encode(&Value::Int(7), &Type::INT2).unwrap();
        assert_eq!(bytes, 7i16.to_be_bytes());
        assert!(encode(&Value::Int(1 << 40), &Type::INT4).is_err());
    }

    #[test]
    fn null_is_null_for_any_type() {
        let (is_null, bytes) = encode(&Value::Null, &Type::JSONB).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(bytes.is_empty());
    }

    #[test]
    fn text_parses_into_typed_columns() {
        let (_, bytes) = encode(&Value::Text("42".into()), &Type::INT8).unwrap();
        assert_eq!(bytes, 42i64.to_be_bytes());
        let (_, bytes) = encode(&Value::Text("t".into()), &Type::BOOL).unwrap();
        assert_eq!(bytes, [1]);
        assert!(encode(&Value::Text("2024-01-02 03:04:05".into()), &Type::TIMESTAMP).is_ok());
        assert!(encode(&Value::Text("nope".into()), &Type::INT4).is_err());
    }

    #[test]
    fn bool_on_text_column_uses_words() {
        let (_, bytes) = encode(&Value::Bool(true), &Type::TEXT).unwrap();
        assert_eq!(bytes, b"true");
    }
}
