use serde::Deserialize;

/// SQL query builder for the menu listing endpoint
/// Builds a single parameterized query with filters, sorting and pagination
pub struct SQLQueryBuilder {
    base_query: String,
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_clause: Option<String>,
    limit: u32,
    offset: u32,
}

impl SQLQueryBuilder {
    /// Creates a new SQLQueryBuilder with default values
    pub fn new() -> Self {
        Self {
            base_query: "SELECT id, name, category_id, price, description, image_url, \
                         is_available, created_at, updated_at FROM menu_items"
                .to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_clause: None,
            limit: 10,
            offset: 0,
        }
    }

    /// Adds a search filter for partial name matching (case-insensitive)
    pub fn add_search_filter(&mut self, search: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses.push(format!("name ILIKE ${}", param_index));
        self.params.push(format!("%{}%", search));
    }

    /// Adds a category filter
    ///
    /// Parameters travel as text, so the comparison casts explicitly.
    pub fn add_category_filter(&mut self, category_id: i32) {
        let param_index = self.params.len() + 1;
        self.where_clauses
            .push(format!("category_id = ${}::INT", param_index));
        self.params.push(category_id.to_string());
    }

    /// Adds price range filters (min and/or max), both bounds inclusive
    pub fn add_price_range(&mut self, min: Option<rust_decimal::Decimal>, max: Option<rust_decimal::Decimal>) {
        if let Some(min_price) = min {
            let param_index = self.params.len() + 1;
            self.where_clauses
                .push(format!("price >= ${}::NUMERIC", param_index));
            self.params.push(min_price.to_string());
        }

        if let Some(max_price) = max {
            let param_index = self.params.len() + 1;
            self.where_clauses
                .push(format!("price <= ${}::NUMERIC", param_index));
            self.params.push(max_price.to_string());
        }
    }

    /// Restricts the listing to currently available items
    pub fn add_available_only(&mut self) {
        self.where_clauses.push("is_available".to_string());
    }

    /// Sets the sort order for the query
    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        let field_name = match field {
            SortField::Price => "price",
            SortField::Name => "name",
        };

        let order_str = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        self.order_clause = Some(format!("{} {}", field_name, order_str));
    }

    /// Sets pagination from a 1-indexed page number and page size
    pub fn set_pagination(&mut self, page: u32, limit: u32) {
        self.limit = limit;
        self.offset = (page - 1) * limit;
    }

    /// Builds the final SQL query string and its parameters
    pub fn build(&self) -> (String, Vec<String>) {
        let mut query = self.base_query.clone();

        if !self.where_clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&self.where_clauses.join(" AND "));
        }

        if let Some(ref order) = self.order_clause {
            query.push_str(" ORDER BY ");
            query.push_str(order);
        }

        // LIMIT and OFFSET are integers we computed ourselves, inlined
        // rather than bound
        query.push_str(&format!(" LIMIT {}", self.limit));
        query.push_str(&format!(" OFFSET {}", self.offset));

        (query, self.params.clone())
    }
}

impl Default for SQLQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Query parameters extracted from the HTTP request, all optional
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    /// Search term for partial name matching (case-insensitive)
    pub search: Option<String>,
    /// Filter by category reference
    pub category: Option<i32>,
    /// Minimum price filter (inclusive)
    pub min_price: Option<rust_decimal::Decimal>,
    /// Maximum price filter (inclusive)
    pub max_price: Option<rust_decimal::Decimal>,
    /// Only list currently available items
    pub available: Option<bool>,
    /// Sort field: "price" or "name"
    pub sort: Option<String>,
    /// Sort order: "asc" or "desc"
    pub order: Option<String>,
    /// Page number (1-indexed, defaults to 1)
    pub page: Option<u32>,
    /// Items per page (defaults to 10, capped at 100)
    pub limit: Option<u32>,
}

/// Sort field options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Price,
    Name,
}

/// Sort order options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Validated and normalized query parameters
#[derive(Debug)]
pub struct ValidatedQuery {
    pub search: Option<String>,
    pub category: Option<i32>,
    pub min_price: Option<rust_decimal::Decimal>,
    pub max_price: Option<rust_decimal::Decimal>,
    pub available_only: bool,
    pub sort_field: Option<SortField>,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

/// Validation error for query parameters
#[derive(Debug)]
pub struct QueryValidationError {
    pub message: String,
}

impl std::fmt::Display for QueryValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for QueryValidationError {}

/// Query parameter validator
pub struct QueryValidator;

impl QueryValidator {
    /// Maximum page size the listing endpoint will serve
    const MAX_LIMIT: u32 = 100;

    /// Validates and normalizes query parameters
    pub fn validate(params: QueryParams) -> Result<ValidatedQuery, QueryValidationError> {
        let search = Self::normalize_string(params.search);

        if let Some(category) = params.category {
            if category < 1 {
                return Err(QueryValidationError {
                    message: "category must be a positive id".to_string(),
                });
            }
        }

        for (value, label) in [(params.min_price, "min_price"), (params.max_price, "max_price")] {
            if let Some(price) = value {
                if price < rust_decimal::Decimal::ZERO {
                    return Err(QueryValidationError {
                        message: format!("{} must not be negative", label),
                    });
                }
            }
        }

        if let (Some(min), Some(max)) = (params.min_price, params.max_price) {
            if min > max {
                return Err(QueryValidationError {
                    message: "min_price must not exceed max_price".to_string(),
                });
            }
        }

        let sort_field = match params.sort.as_deref() {
            None => None,
            Some("price") => Some(SortField::Price),
            Some("name") => Some(SortField::Name),
            Some(other) => {
                return Err(QueryValidationError {
                    message: format!("unsupported sort field '{}'", other),
                })
            }
        };

        let sort_order = match params.order.as_deref() {
            None | Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            Some(other) => {
                return Err(QueryValidationError {
                    message: format!("unsupported sort order '{}'", other),
                })
            }
        };

        let page = params.page.unwrap_or(1);
        if page == 0 {
            return Err(QueryValidationError {
                message: "page is 1-indexed".to_string(),
            });
        }

        let limit = params.limit.unwrap_or(10);
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(QueryValidationError {
                message: format!("limit must be between 1 and {}", Self::MAX_LIMIT),
            });
        }

        Ok(ValidatedQuery {
            search,
            category: params.category,
            min_price: params.min_price,
            max_price: params.max_price,
            available_only: params.available.unwrap_or(false),
            sort_field,
            sort_order,
            page,
            limit,
        })
    }

    /// Trims a string parameter, treating empty results as absent
    fn normalize_string(value: Option<String>) -> Option<String> {
        value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn empty_params() -> QueryParams {
        QueryParams {
            search: None,
            category: None,
            min_price: None,
            max_price: None,
            available: None,
            sort: None,
            order: None,
            page: None,
            limit: None,
        }
    }

    #[test]
    fn test_build_without_filters() {
        let builder = SQLQueryBuilder::new();
        let (query, params) = builder.build();

        assert!(query.starts_with("SELECT"));
        assert!(!query.contains("WHERE"));
        assert!(query.ends_with("LIMIT 10 OFFSET 0"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_with_search_and_category() {
        let mut builder = SQLQueryBuilder::new();
        builder.add_search_filter("pizza");
        builder.add_category_filter(3);

        let (query, params) = builder.build();
        assert!(query.contains("name ILIKE $1"));
        assert!(query.contains("category_id = $2::INT"));
        assert_eq!(params, vec!["%pizza%".to_string(), "3".to_string()]);
    }

    #[test]
    fn test_build_with_price_range() {
        let mut builder = SQLQueryBuilder::new();
        builder.add_price_range(Some(dec!(5.00)), Some(dec!(20.00)));

        let (query, params) = builder.build();
        assert!(query.contains("price >= $1::NUMERIC"));
        assert!(query.contains("price <= $2::NUMERIC"));
        assert_eq!(params, vec!["5.00".to_string(), "20.00".to_string()]);
    }

    #[test]
    fn test_build_with_sort_and_pagination() {
        let mut builder = SQLQueryBuilder::new();
        builder.set_sort(SortField::Price, SortOrder::Desc);
        builder.set_pagination(3, 25);

        let (query, _) = builder.build();
        assert!(query.contains("ORDER BY price DESC"));
        assert!(query.ends_with("LIMIT 25 OFFSET 50"));
    }

    #[test]
    fn test_validator_defaults() {
        let validated = QueryValidator::validate(empty_params()).unwrap();

        assert_eq!(validated.page, 1);
        assert_eq!(validated.limit, 10);
        assert_eq!(validated.sort_order, SortOrder::Asc);
        assert!(validated.sort_field.is_none());
        assert!(!validated.available_only);
    }

    #[test]
    fn test_validator_normalizes_search() {
        let mut params = empty_params();
        params.search = Some("   ".to_string());
        let validated = QueryValidator::validate(params).unwrap();
        assert!(validated.search.is_none());

        let mut params = empty_params();
        params.search = Some("  lasagna ".to_string());
        let validated = QueryValidator::validate(params).unwrap();
        assert_eq!(validated.search.as_deref(), Some("lasagna"));
    }

    #[test]
    fn test_validator_rejects_inverted_price_range() {
        let mut params = empty_params();
        params.min_price = Some(dec!(20));
        params.max_price = Some(dec!(5));
        assert!(QueryValidator::validate(params).is_err());
    }

    #[test]
    fn test_validator_rejects_negative_price() {
        let mut params = empty_params();
        params.min_price = Some(dec!(-1));
        assert!(QueryValidator::validate(params).is_err());
    }

    #[test]
    fn test_validator_rejects_unknown_sort() {
        let mut params = empty_params();
        params.sort = Some("rating".to_string());
        assert!(QueryValidator::validate(params).is_err());
    }

    #[test]
    fn test_validator_rejects_zero_page_and_oversized_limit() {
        let mut params = empty_params();
        params.page = Some(0);
        assert!(QueryValidator::validate(params).is_err());

        let mut params = empty_params();
        params.limit = Some(101);
        assert!(QueryValidator::validate(params).is_err());
    }
}
