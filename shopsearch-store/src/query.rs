//! The conjunctive filter expression sent to the product store.

use serde_json::Value;
use shopsearch_intent::Intent;

/// Column holding the tags a product is listed under.
pub const TAGS_COLUMN: &str = "tags";
/// Column holding a product's price.
pub const PRICE_COLUMN: &str = "price";
/// Column holding the use cases a product suits.
pub const USE_CASE_COLUMN: &str = "use_case";

/// A single predicate on one column.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// The array column contains every one of `values`.
    Contains {
        /// Name of an array-typed column.
        column: String,
        /// Values that must all be present.
        values: Vec<String>,
    },

    /// The numeric column is at most `value`.
    LessThanOrEqual {
        /// Name of a numeric column.
        column: String,
        /// The inclusive upper bound.
        value: f64,
    },
}

impl Filter {
    /// Render as a PostgREST query parameter, such as `("tags", "cs.{laptop}")`.
    ///
    /// Array values are joined without quoting.
    pub fn to_query_pair(&self) -> (String, String) {
        match self {
            Filter::Contains { column, values } => {
                (column.clone(), format!("cs.{{{}}}", values.join(",")))
            }
            Filter::LessThanOrEqual { column, value } => (column.clone(), format!("lte.{}", value)),
        }
    }

    /// Test a row against this filter. Rows missing the column, or holding a
    /// value of the wrong type, never match.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Contains { column, values } => row
                .get(column)
                .and_then(Value::as_array)
                .map_or(false, |items| {
                    values
                        .iter()
                        .all(|wanted| items.iter().any(|item| item.as_str() == Some(wanted)))
                }),
            Filter::LessThanOrEqual { column, value } => row
                .get(column)
                .and_then(Value::as_f64)
                .map_or(false, |actual| actual <= *value),
        }
    }
}

/// Select some columns from a table, keeping rows that match every filter.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductQuery {
    /// The table to read from.
    pub table: String,

    /// The PostgREST `select` expression.
    pub columns: String,

    /// Predicates that must all hold.
    pub filters: Vec<Filter>,
}

impl ProductQuery {
    /// Build the query for an intent: rows tagged with the product type, priced
    /// within budget, and, if the intent names any use cases, suited to all of
    /// them.
    pub fn from_intent(table: &str, intent: &Intent) -> Self {
        let mut filters = vec![
            Filter::Contains {
                column: TAGS_COLUMN.to_string(),
                values: vec![intent.product_type.clone()],
            },
            Filter::LessThanOrEqual {
                column: PRICE_COLUMN.to_string(),
                value: intent.budget,
            },
        ];

        if let Some(use_cases) = intent.use_cases() {
            filters.push(Filter::Contains {
                column: USE_CASE_COLUMN.to_string(),
                values: use_cases.to_vec(),
            });
        }

        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters,
        }
    }

    /// Render every part of the query as PostgREST query parameters, `select`
    /// first and then the filters in order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        std::iter::once(("select".to_string(), self.columns.clone()))
            .chain(self.filters.iter().map(Filter::to_query_pair))
            .collect()
    }

    /// Test a row against every filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }
}

#[cfg(test)]
mod tests {
    use super::{Filter, ProductQuery};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use shopsearch_intent::Intent;

    fn intent(use_case: Option<Vec<&str>>) -> Intent {
        Intent {
            product_type: "laptop".to_string(),
            use_case: use_case.map(|cases| cases.into_iter().map(String::from).collect()),
            budget: 1500.0,
            style: None,
        }
    }

    fn pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn use_case_adds_a_third_filter() {
        let query = ProductQuery::from_intent("products", &intent(Some(vec!["gaming"])));

        assert_eq!(
            query.filters,
            vec![
                Filter::Contains {
                    column: "tags".to_string(),
                    values: vec!["laptop".to_string()],
                },
                Filter::LessThanOrEqual {
                    column: "price".to_string(),
                    value: 1500.0,
                },
                Filter::Contains {
                    column: "use_case".to_string(),
                    values: vec!["gaming".to_string()],
                },
            ]
        );
        assert_eq!(
            query.to_query_pairs(),
            pairs(&[
                ("select", "*"),
                ("tags", "cs.{laptop}"),
                ("price", "lte.1500"),
                ("use_case", "cs.{gaming}"),
            ])
        );
    }

    #[test]
    fn missing_or_empty_use_case_has_two_filters() {
        for use_case in [None, Some(vec![])] {
            let query = ProductQuery::from_intent("products", &intent(use_case));
            assert_eq!(query.filters.len(), 2);
            assert_eq!(
                query.to_query_pairs(),
                pairs(&[("select", "*"), ("tags", "cs.{laptop}"), ("price", "lte.1500")])
            );
        }
    }

    #[test]
    fn several_use_cases_are_required_together() {
        let query = ProductQuery::from_intent("products", &intent(Some(vec!["gaming", "editing"])));
        assert_eq!(
            query.filters[2].to_query_pair(),
            ("use_case".to_string(), "cs.{gaming,editing}".to_string())
        );

        let both = json!({"tags": ["laptop"], "price": 1200, "use_case": ["editing", "gaming"]});
        let one = json!({"tags": ["laptop"], "price": 1200, "use_case": ["gaming"]});
        assert!(query.matches(&both));
        assert!(!query.matches(&one));
    }

    #[test]
    fn fractional_budgets_keep_their_decimals() {
        let mut intent = intent(None);
        intent.budget = 99.5;
        let query = ProductQuery::from_intent("products", &intent);
        assert_eq!(
            query.filters[1].to_query_pair(),
            ("price".to_string(), "lte.99.5".to_string())
        );
    }

    #[test]
    fn price_bound_is_inclusive() {
        let query = ProductQuery::from_intent("products", &intent(None));
        assert!(query.matches(&json!({"tags": ["laptop"], "price": 1500})));
        assert!(!query.matches(&json!({"tags": ["laptop"], "price": 1500.01})));
        assert!(!query.matches(&json!({"tags": ["tablet"], "price": 10})));
        assert!(!query.matches(&json!({"tags": ["laptop"]})));
    }
}
