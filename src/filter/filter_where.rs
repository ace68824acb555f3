use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterNode, FilterOp, FilterWhereInfo, SqlParam};

/// Parses Mongo-style `where` documents and evaluates them either as SQL over
/// a `jsonb` column named `data` or directly against in-memory documents.
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

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    pub fn parse(where_data: &Value) -> Result<FilterNode, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(FilterNode::And(vec![])),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut nodes = Vec::new();
        for (key, value) in obj {
            if key.starts_with('$') {
                nodes.push(Self::parse_logical_operator(key, value)?);
            } else {
                validate_field_path(key)?;
                Self::parse_field_condition(key, value, &mut nodes)?;
            }
        }
        Ok(FilterNode::And(nodes))
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<FilterNode, FilterError> {
        let arr = value
            .as_array()
            .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
        let children = arr.iter().map(Self::parse).collect::<Result<Vec<_>, _>>()?;
        match op {
            "$and" => Ok(FilterNode::And(children)),
            "$or" => Ok(FilterNode::Or(children)),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value, out: &mut Vec<FilterNode>) -> Result<(), FilterError> {
        match value {
            Value::Object(obj) if obj.keys().any(|k| k.starts_with('$')) => {
                for (op_key, op_val) in obj {
                    let operator = Self::map_operator(op_key)?;
                    if matches!(operator, FilterOp::In | FilterOp::NIn) && !op_val.is_array() {
                        return Err(FilterError::InvalidOperatorData(format!("{} requires array", op_key)));
                    }
                    if operator == FilterOp::ILike && !op_val.is_string() {
                        return Err(FilterError::InvalidOperatorData("$ilike requires string".to_string()));
                    }
                    out.push(FilterNode::Condition(FilterWhereInfo {
                        column: field.to_string(),
                        operator,
                        data: op_val.clone(),
                    }));
                }
            }
            // Implicit equality: { field: value }
            _ => out.push(FilterNode::Condition(FilterWhereInfo {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            })),
        }
        Ok(())
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$ilike" => FilterOp::ILike,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    /// Renders `node` as a SQL boolean expression. Placeholders are numbered
    /// from `starting_param_index + 1`.
    pub fn generate(node: &FilterNode, starting_param_index: usize) -> (String, Vec<SqlParam>) {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build_sql(node);
        (sql, filter_where.param_values)
    }

    fn build_sql(&mut self, node: &FilterNode) -> String {
        match node {
            FilterNode::Condition(info) => self.build_sql_condition(info),
            FilterNode::And(children) if children.is_empty() => "TRUE".to_string(),
            FilterNode::Or(children) if children.is_empty() => "FALSE".to_string(),
            FilterNode::And(children) => self.join(children, " AND "),
            FilterNode::Or(children) => self.join(children, " OR "),
        }
    }

    fn join(&mut self, children: &[FilterNode], joiner: &str) -> String {
        let parts: Vec<String> = children.iter().map(|c| format!("({})", self.build_sql(c))).collect();
        parts.join(joiner)
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> String {
        let path = json_path(&condition.column);
        match condition.operator {
            FilterOp::Eq if condition.data.is_null() => format!("COALESCE({}, 'null'::jsonb) = 'null'::jsonb", path),
            FilterOp::Ne if condition.data.is_null() => format!("COALESCE({}, 'null'::jsonb) <> 'null'::jsonb", path),
            FilterOp::Eq => format!("{} = {}", path, self.param(SqlParam::Json(condition.data.clone()))),
            FilterOp::Ne => format!("{} IS DISTINCT FROM {}", path, self.param(SqlParam::Json(condition.data.clone()))),
            FilterOp::Gt => format!("{} > {}", path, self.param(SqlParam::Json(condition.data.clone()))),
            FilterOp::Gte => format!("{} >= {}", path, self.param(SqlParam::Json(condition.data.clone()))),
            FilterOp::Lt => format!("{} < {}", path, self.param(SqlParam::Json(condition.data.clone()))),
            FilterOp::Lte => format!("{} <= {}", path, self.param(SqlParam::Json(condition.data.clone()))),
            FilterOp::In | FilterOp::NIn => {
                let values = condition.data.as_array().cloned().unwrap_or_default();
                let negate = condition.operator == FilterOp::NIn;
                if values.is_empty() {
                    return if negate { "TRUE" } else { "FALSE" }.to_string();
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(SqlParam::Json(v))).collect();
                if negate {
                    format!("({0} IS NULL OR {0} NOT IN ({1}))", path, params.join(", "))
                } else {
                    format!("{} IN ({})", path, params.join(", "))
                }
            }
            FilterOp::ILike => {
                let pattern = condition.data.as_str().unwrap_or_default().to_string();
                format!("{} ILIKE {}", text_path(&condition.column), self.param(SqlParam::Text(pattern)))
            }
        }
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }

    /// In-memory evaluation with the same semantics as the generated SQL
    pub fn matches(node: &FilterNode, document: &Value) -> bool {
        match node {
            FilterNode::And(children) => children.iter().all(|c| Self::matches(c, document)),
            FilterNode::Or(children) => children.iter().any(|c| Self::matches(c, document)),
            FilterNode::Condition(info) => Self::matches_condition(info, document),
        }
    }

    fn matches_condition(info: &FilterWhereInfo, document: &Value) -> bool {
        let actual = lookup(document, &info.column);
        let expected = &info.data;
        match info.operator {
            FilterOp::Eq => match actual {
                None | Some(Value::Null) => expected.is_null(),
                Some(v) => values_equal(v, expected),
            },
            FilterOp::Ne => match actual {
                None | Some(Value::Null) => !expected.is_null(),
                Some(v) => !values_equal(v, expected),
            },
            FilterOp::Gt => ordered(actual, expected).map_or(false, |o| o == Ordering::Greater),
            FilterOp::Gte => ordered(actual, expected).map_or(false, |o| o != Ordering::Less),
            FilterOp::Lt => ordered(actual, expected).map_or(false, |o| o == Ordering::Less),
            FilterOp::Lte => ordered(actual, expected).map_or(false, |o| o != Ordering::Greater),
            FilterOp::In => {
                let candidates = expected.as_array().map(Vec::as_slice).unwrap_or_default();
                actual.map_or(false, |v| candidates.iter().any(|c| values_equal(v, c)))
            }
            FilterOp::NIn => {
                let candidates = expected.as_array().map(Vec::as_slice).unwrap_or_default();
                actual.map_or(true, |v| !candidates.iter().any(|c| values_equal(v, c)))
            }
            FilterOp::ILike => {
                let pattern = expected.as_str().unwrap_or_default();
                match actual {
                    Some(Value::String(s)) => ilike(s, pattern),
                    Some(Value::Number(n)) => ilike(&n.to_string(), pattern),
                    Some(Value::Bool(b)) => ilike(&b.to_string(), pattern),
                    _ => false,
                }
            }
        }
    }
}

/// Field names are dotted paths of `[A-Za-z0-9_]` segments
pub fn validate_field_path(path: &str) -> Result<(), FilterError> {
    let valid = !path.is_empty()
        && path.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(FilterError::InvalidField(path.to_string()))
    }
}

/// `data #> '{a,b}'`, the jsonb value at a validated dotted path
pub fn json_path(column: &str) -> String {
    format!("data #> '{{{}}}'", column.replace('.', ","))
}

fn text_path(column: &str) -> String {
    format!("data #>> '{{{}}}'", column.replace('.', ","))
}

pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |current, segment| current.get(segment))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn ordered(actual: Option<&Value>, expected: &Value) -> Option<Ordering> {
    match (actual?, expected) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order used for sorting, following jsonb's ordering of types:
/// null < string < number < boolean < array < object. Missing values sort last.
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::String(_) => 1,
            Value::Number(_) => 2,
            Value::Bool(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => match (x, y) {
            (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Bool(_), Value::Bool(_)) => ordered(Some(x), y).unwrap_or(Ordering::Equal),
            _ => rank(x).cmp(&rank(y)),
        },
    }
}

/// Case-insensitive SQL `LIKE`: `%` matches any run, `_` a single character
pub fn ilike(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

    let (mut v, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while v < value.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == value[v]) {
            v += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, v));
            p += 1;
        } else if let Some((bp, bv)) = backtrack {
            p = bp + 1;
            v = bv + 1;
            backtrack = Some((bp, bv + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> FilterNode {
        FilterWhere::parse(&v).unwrap()
    }

    #[test]
    fn implicit_equality_and_operators_render_sql() {
        let node = parse(json!({ "shop": "abc", "stock": { "$gte": 1 } }));
        let (sql, params) = FilterWhere::generate(&node, 0);
        assert_eq!(sql, "(data #> '{shop}' = $1) AND (data #> '{stock}' >= $2)");
        assert_eq!(params, vec![SqlParam::Json(json!("abc")), SqlParam::Json(json!(1))]);
    }

    #[test]
    fn or_clauses_continue_parameter_numbering() {
        let node = parse(json!({ "$or": [{ "name": { "$ilike": "%shoe%" } }, { "customer.email": "a@b.c" }] }));
        let (sql, params) = FilterWhere::generate(&node, 2);
        assert_eq!(
            sql,
            "(((data #>> '{name}' ILIKE $3)) OR ((data #> '{customer,email}' = $4)))"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn null_equality_matches_missing_fields() {
        let node = parse(json!({ "parent": null }));
        assert!(FilterWhere::matches(&node, &json!({ "parent": null })));
        assert!(FilterWhere::matches(&node, &json!({})));
        assert!(!FilterWhere::matches(&node, &json!({ "parent": "x" })));
        let (sql, params) = FilterWhere::generate(&node, 0);
        assert_eq!(sql, "(COALESCE(data #> '{parent}', 'null'::jsonb) = 'null'::jsonb)");
        assert!(params.is_empty());
    }

    #[test]
    fn in_and_nin_handle_empty_lists() {
        let doc = json!({ "category": "a" });
        assert!(!FilterWhere::matches(&parse(json!({ "category": { "$in": [] } })), &doc));
        assert!(FilterWhere::matches(&parse(json!({ "category": { "$nin": [] } })), &doc));
        assert!(FilterWhere::matches(&parse(json!({ "category": { "$in": ["b", "a"] } })), &doc));
        let (sql, _) = FilterWhere::generate(&parse(json!({ "category": { "$in": [] } })), 0);
        assert_eq!(sql, "(FALSE)");
    }

    #[test]
    fn numeric_comparisons_ignore_representation() {
        let doc = json!({ "stock": 5 });
        assert!(FilterWhere::matches(&parse(json!({ "stock": 5.0 })), &doc));
        assert!(FilterWhere::matches(&parse(json!({ "stock": { "$lte": 5 } })), &doc));
        assert!(!FilterWhere::matches(&parse(json!({ "stock": { "$gt": 5 } })), &doc));
        assert!(!FilterWhere::matches(&parse(json!({ "stock": { "$gt": "1" } })), &doc));
    }

    #[test]
    fn ilike_wildcards() {
        assert!(ilike("Running Shoe", "%shoe"));
        assert!(ilike("Running Shoe", "run%"));
        assert!(ilike("abc", "a_c"));
        assert!(ilike("abc", "%"));
        assert!(!ilike("abc", "a_"));
        assert!(ilike("aXbXc", "%x%c"));
    }

    #[test]
    fn rejects_bad_fields_and_operators() {
        assert!(matches!(
            FilterWhere::parse(&json!({ "name; drop": 1 })),
            Err(FilterError::InvalidField(_))
        ));
        assert!(matches!(
            FilterWhere::parse(&json!({ "name": { "$regex": "x" } })),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            FilterWhere::parse(&json!({ "name": { "$in": "x" } })),
            Err(FilterError::InvalidOperatorData(_))
        ));
    }
}
