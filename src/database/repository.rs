use std::marker::PhantomData;

use sqlx::{postgres::PgRow, FromRow, PgConnection};

use crate::database::manager::DatabaseError;
use crate::database::models::Page;
use crate::database::query_builder;
use crate::filter::Filter;

/// Typed reads over one table. `R` is the raw row, `T` the domain value it converts into.
pub struct Repository<R, T> {
    table_name: &'static str,
    _phantom: PhantomData<fn(R) -> T>,
}

impl<R, T> Repository<R, T>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    T: TryFrom<R, Error = DatabaseError>,
{
    pub const fn new(table_name: &'static str) -> Self {
        Self { table_name, _phantom: PhantomData }
    }

    pub fn filter(&self) -> Result<Filter, DatabaseError> {
        Ok(Filter::new(self.table_name)?)
    }

    pub async fn select_any(&self, conn: &mut PgConnection, filter: &Filter) -> Result<Vec<T>, DatabaseError> {
        let rows: Vec<R> = query_builder::fetch_all(conn, &filter.to_sql()?).await?;
        rows.into_iter().map(T::try_from).collect()
    }

    pub async fn select_one(&self, conn: &mut PgConnection, filter: &Filter) -> Result<Option<T>, DatabaseError> {
        let row: Option<R> = query_builder::fetch_optional(conn, &filter.to_sql()?).await?;
        row.map(T::try_from).transpose()
    }

    pub async fn count(&self, conn: &mut PgConnection, filter: &Filter) -> Result<i64, DatabaseError> {
        query_builder::fetch_count(conn, &filter.to_count_sql()?).await
    }

    /// Rows for the filter's LIMIT/OFFSET window plus the unwindowed total
    pub async fn page(&self, conn: &mut PgConnection, filter: &Filter) -> Result<Page<T>, DatabaseError> {
        let total = self.count(&mut *conn, filter).await?;
        let items = self.select_any(conn, filter).await?;
        Ok(Page { items, total })
    }
}
