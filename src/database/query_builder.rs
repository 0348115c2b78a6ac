use sqlx::{self, postgres::PgArguments, postgres::PgRow, FromRow, PgConnection, Row};

use crate::database::manager::{map_read_error, DatabaseError};
use crate::filter::{SqlParam, SqlResult};

/// Run a generated SELECT and map every row
pub async fn fetch_all<T>(conn: &mut PgConnection, sql: &SqlResult) -> Result<Vec<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut q = sqlx::query_as::<_, T>(&sql.query);
    for p in sql.params.iter() {
        q = bind_param_query_as(q, p);
    }
    q.fetch_all(conn).await.map_err(map_read_error)
}

pub async fn fetch_optional<T>(conn: &mut PgConnection, sql: &SqlResult) -> Result<Option<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut q = sqlx::query_as::<_, T>(&sql.query);
    for p in sql.params.iter() {
        q = bind_param_query_as(q, p);
    }
    q.fetch_optional(conn).await.map_err(map_read_error)
}

/// Run a generated `SELECT COUNT(*) as count` query
pub async fn fetch_count(conn: &mut PgConnection, sql: &SqlResult) -> Result<i64, DatabaseError> {
    let mut q = sqlx::query(&sql.query);
    for p in sql.params.iter() {
        q = bind_param_query(q, p);
    }
    let row = q.fetch_one(conn).await.map_err(map_read_error)?;
    let count: i64 = row.try_get("count")?;
    Ok(count)
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q SqlParam,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        SqlParam::Bool(b) => q.bind(*b),
        SqlParam::Text(s) => q.bind(s.as_str()),
        SqlParam::Uuid(id) => q.bind(*id),
        SqlParam::Timestamp(at) => q.bind(*at),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q SqlParam,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        SqlParam::Bool(b) => q.bind(*b),
        SqlParam::Text(s) => q.bind(s.as_str()),
        SqlParam::Uuid(id) => q.bind(*id),
        SqlParam::Timestamp(at) => q.bind(*at),
    }
}
