use super::types::{FilterCondition, FilterOp, FilterWhereInfo, SqlParam};

pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Render `conditions` joined with AND. Placeholders are numbered from
    /// `starting_param_index + 1`.
    pub fn generate(
        conditions: &[FilterCondition],
        starting_param_index: usize,
    ) -> (String, Vec<SqlParam>) {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(conditions)
    }

    fn build(&mut self, conditions: &[FilterCondition]) -> (String, Vec<SqlParam>) {
        let mut sql_conditions = vec![];
        for condition in conditions {
            match condition {
                FilterCondition::Field(info) => sql_conditions.push(self.build_sql_condition(info)),
                FilterCondition::Any(infos) => {
                    if infos.is_empty() {
                        continue;
                    }
                    let mut parts = Vec::with_capacity(infos.len());
                    for info in infos {
                        parts.push(self.build_sql_condition(info));
                    }
                    sql_conditions.push(format!("({})", parts.join(" OR ")));
                }
            }
        }

        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        (where_clause, std::mem::take(&mut self.param_values))
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> String {
        let symbol = match condition.operator {
            FilterOp::Eq => "=",
            FilterOp::ILike => "ILIKE",
        };
        format!("\"{}\" {} {}", condition.column, symbol, self.param(condition.data.clone()))
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn field(column: &str, operator: FilterOp, data: SqlParam) -> FilterWhereInfo {
        FilterWhereInfo { column: column.to_string(), operator, data }
    }

    #[test]
    fn empty_conditions_match_everything() {
        let (sql, params) = FilterWhere::generate(&[], 0);
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());
    }

    #[test]
    fn or_groups_share_placeholder_numbering() {
        let org = Uuid::new_v4();
        let conditions = vec![
            FilterCondition::Field(field("organization_id", FilterOp::Eq, org.into())),
            FilterCondition::Any(vec![
                field("name", FilterOp::ILike, "%ana%".into()),
                field("email", FilterOp::ILike, "%ana%".into()),
            ]),
            FilterCondition::Field(field("is_active", FilterOp::Eq, true.into())),
        ];

        let (sql, params) = FilterWhere::generate(&conditions, 0);
        assert_eq!(
            sql,
            "\"organization_id\" = $1 AND (\"name\" ILIKE $2 OR \"email\" ILIKE $3) AND \"is_active\" = $4"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[0], SqlParam::Uuid(org));
    }

    #[test]
    fn starting_index_offsets_placeholders() {
        let conditions = vec![FilterCondition::Field(field("role", FilterOp::Eq, "admin".into()))];
        let (sql, _) = FilterWhere::generate(&conditions, 3);
        assert_eq!(sql, "\"role\" = $4");
    }
}
