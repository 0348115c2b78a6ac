use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterCondition, FilterOp, FilterOrderInfo, FilterWhereInfo, SqlParam, SqlResult};

pub struct Filter {
    table_name: String,
    conditions: Vec<FilterCondition>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            conditions: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn where_eq(&mut self, column: &str, value: impl Into<SqlParam>) -> Result<&mut Self, FilterError> {
        Self::validate_column(column)?;
        self.conditions.push(FilterCondition::Field(FilterWhereInfo {
            column: column.to_string(),
            operator: FilterOp::Eq,
            data: value.into(),
        }));
        Ok(self)
    }

    /// Case-insensitive partial match of `term` against any of `columns`.
    /// LIKE wildcards inside the term are escaped; a blank term adds nothing.
    pub fn search(&mut self, columns: &[&str], term: &str) -> Result<&mut Self, FilterError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(self);
        }
        let pattern = format!("%{}%", escape_like(term));
        let mut group = Vec::with_capacity(columns.len());
        for column in columns {
            Self::validate_column(column)?;
            group.push(FilterWhereInfo {
                column: column.to_string(),
                operator: FilterOp::ILike,
                data: SqlParam::Text(pattern.clone()),
            });
        }
        self.conditions.push(FilterCondition::Any(group));
        Ok(self)
    }

    pub fn order(&mut self, clause: &str) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::parse(clause)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.conditions, 0);
        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            FilterOrder::generate(&self.order_data),
            self.build_limit_clause(),
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.conditions, 0);
        Ok(SqlResult { query: where_clause, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = format!(
            "SELECT COUNT(*) as count FROM \"{}\" WHERE {}",
            self.table_name, where_result.query
        );
        Ok(SqlResult { query, params: where_result.params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if !is_identifier(name) {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    pub(crate) fn validate_column(column: &str) -> Result<(), FilterError> {
        if !is_identifier(column) {
            return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn builds_scoped_paginated_select() {
        let org = Uuid::new_v4();
        let mut filter = Filter::new("patients").unwrap();
        filter
            .where_eq("organization_id", org).unwrap()
            .search(&["name", "document"], "Ana").unwrap()
            .order("name asc").unwrap()
            .limit(10, Some(20)).unwrap();

        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"patients\" WHERE \"organization_id\" = $1 AND (\"name\" ILIKE $2 OR \"document\" ILIKE $3) ORDER BY \"name\" ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params[1], SqlParam::Text("%Ana%".to_string()));
    }

    #[test]
    fn count_ignores_order_and_limit() {
        let mut filter = Filter::new("users").unwrap();
        filter.where_eq("role", "dentist").unwrap().order("name").unwrap().limit(5, None).unwrap();
        let sql = filter.to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) as count FROM \"users\" WHERE \"role\" = $1");
    }

    #[test]
    fn search_escapes_wildcards_and_skips_blank_terms() {
        let mut filter = Filter::new("users").unwrap();
        filter.search(&["name"], "   ").unwrap();
        assert_eq!(filter.to_where_sql().unwrap().query, "1=1");

        filter.search(&["name"], "50%_off").unwrap();
        let sql = filter.to_where_sql().unwrap();
        assert_eq!(sql.params[0], SqlParam::Text("%50\\%\\_off%".to_string()));
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert!(Filter::new("patients; drop").is_err());
        assert!(Filter::new("1patients").is_err());
        let mut filter = Filter::new("patients").unwrap();
        assert!(filter.where_eq("name\"--", "x").is_err());
        assert!(filter.search(&["name", "bad column"], "ana").is_err());
    }
}
