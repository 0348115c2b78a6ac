use super::error::FilterError;
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `"name asc, created_at desc"` style clauses
    pub fn parse(clause: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in clause.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                super::filter::Filter::validate_column(col)?;
                let sort = match it.next() {
                    None => SortDirection::Asc,
                    Some(dir) if dir.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                    Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                    Some(dir) => return Err(FilterError::InvalidColumn(format!("Invalid sort direction: {}", dir))),
                };
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        Ok(out)
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() { return String::new(); }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_columns() {
        let infos = FilterOrder::parse("name asc, created_at DESC").unwrap();
        assert_eq!(FilterOrder::generate(&infos), "ORDER BY \"name\" ASC, \"created_at\" DESC");
    }

    #[test]
    fn rejects_injection_attempts() {
        assert!(FilterOrder::parse("name; drop table users").is_err());
        assert!(FilterOrder::parse("name sideways").is_err());
    }
}
