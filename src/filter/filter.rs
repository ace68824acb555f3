use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterNode, FilterOrderInfo, SqlResult};

/// A validated query over one collection, rendered either to SQL or applied
/// to documents held in memory.
pub struct Filter {
    table_name: String,
    where_node: FilterNode,
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
            where_node: FilterNode::And(vec![]),
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn from_data(table_name: impl Into<String>, data: FilterData) -> Result<Self, FilterError> {
        let mut filter = Self::new(table_name)?;
        filter.assign(data)?;
        Ok(filter)
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if data.limit.is_some() || data.offset.is_some() { self.limit(data.limit, data.offset)?; }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_node = FilterWhere::parse(&conditions)?;
        Ok(self)
    }

    pub fn order(&mut self, order_clause: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_clause)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: Option<i64>, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if let Some(l) = limit { if l < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); } }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }

        let max_limit = crate::config::CONFIG.api.max_page_size;
        self.limit = limit.map(|l| {
            if l > max_limit {
                tracing::debug!("Limit {} exceeds max {}, capping to max", l, max_limit);
                max_limit
            } else {
                l
            }
        });
        self.offset = offset;
        Ok(self)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn to_sql(&self) -> SqlResult {
        let where_result = self.to_where_sql(0);
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT data".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_result.query),
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        SqlResult { query, params: where_result.params }
    }

    /// The bare predicate, with placeholders numbered after `starting_param_index`
    pub fn to_where_sql(&self, starting_param_index: usize) -> SqlResult {
        let (query, params) = FilterWhere::generate(&self.where_node, starting_param_index);
        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let where_result = self.to_where_sql(0);
        SqlResult {
            query: format!("SELECT COUNT(*) FROM \"{}\" WHERE {}", self.table_name, where_result.query),
            params: where_result.params,
        }
    }

    pub fn matches(&self, document: &Value) -> bool {
        FilterWhere::matches(&self.where_node, document)
    }

    /// Filters, sorts and pages `documents` the way `to_sql` would
    pub fn apply<'a, I>(&self, documents: I) -> Vec<Value>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut matched: Vec<Value> = documents.into_iter().filter(|d| self.matches(d)).cloned().collect();
        FilterOrder::sort(&self.order_data, &mut matched);
        let offset = self.offset.unwrap_or(0) as usize;
        let limit = self.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        matched.into_iter().skip(offset).take(limit).collect()
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(FilterError::InvalidCollection(format!("Invalid collection name format: {}", name)));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_select_statement() {
        let filter = Filter::from_data(
            "products",
            FilterData::matching(json!({ "isActive": true })).order("createdAt desc").page(10, 20),
        )
        .unwrap();
        let sql = filter.to_sql();
        assert_eq!(
            sql.query,
            "SELECT data FROM \"products\" WHERE (data #> '{isActive}' = $1) ORDER BY data #> '{createdAt}' DESC, seq ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(filter.to_count_sql().query, "SELECT COUNT(*) FROM \"products\" WHERE (data #> '{isActive}' = $1)");
    }

    #[test]
    fn apply_filters_sorts_and_pages() {
        let docs = vec![
            json!({ "n": 1, "on": true }),
            json!({ "n": 2, "on": false }),
            json!({ "n": 3, "on": true }),
            json!({ "n": 4, "on": true }),
        ];
        let filter = Filter::from_data("things", FilterData::matching(json!({ "on": true })).order("n desc").page(2, 1)).unwrap();
        let out = filter.apply(&docs);
        assert_eq!(out, vec![json!({ "n": 3, "on": true }), json!({ "n": 1, "on": true })]);
    }

    #[test]
    fn rejects_bad_collection_and_negative_paging() {
        assert!(Filter::new("bad name").is_err());
        assert!(Filter::from_data("ok", FilterData::new().page(-1, 0)).is_err());
    }
}
