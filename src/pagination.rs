// Page-number pagination and query-string helpers

use serde::Serialize;

use crate::config::PaginationConfig;
use crate::error::{AppError, AppResult};

/// Raw query pairs, kept as a list so repeated keys (`?tags=a&tags=b`) survive.
#[derive(Debug, Clone, Default)]
pub struct QueryParams(pub Vec<(String, String)>);

impl QueryParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn get_i64(&self, key: &str) -> AppResult<Option<i64>> {
        match self.get(key).map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AppError::Validation(format!("{} must be an integer", key))),
        }
    }

    /// `1` and `true` switch a filter on; anything else leaves it off.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key).map(str::trim), Some("1") | Some("true") | Some("True"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    /// Read `page` and `limit`; the limit is clamped to the configured maximum.
    pub fn from_query(params: &QueryParams, config: &PaginationConfig) -> AppResult<Self> {
        let page = params.get_i64("page")?.unwrap_or(1);
        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        let limit = match params.get_i64("limit")? {
            Some(limit) if limit < 1 => {
                return Err(AppError::Validation("limit must be at least 1".to_string()))
            }
            Some(limit) => limit.min(config.max_limit),
            None => config.default_limit,
        };
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// `{count, next, previous, results}` envelope; `next`/`previous` are page numbers.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, params: PageParams) -> Self {
        let next = if params.offset().saturating_add(params.limit) < count {
            params.page.checked_add(1)
        } else {
            None
        };
        let previous = (params.page > 1).then_some(params.page - 1);
        Self {
            count,
            next,
            previous,
            results,
        }
    }

    /// Paginate an already materialised list.
    pub fn from_vec(items: Vec<T>, params: PageParams) -> Self {
        let count = items.len() as i64;
        let results = items
            .into_iter()
            .skip(usize::try_from(params.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(params.limit).unwrap_or(usize::MAX))
            .collect();
        Self::new(results, count, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn test_page_params() {
        let config = PaginationConfig::default();
        let p = PageParams::from_query(&params(&[]), &config).unwrap();
        assert_eq!(p, PageParams { page: 1, limit: 6 });

        let p = PageParams::from_query(&params(&[("page", "3"), ("limit", "1000")]), &config).unwrap();
        assert_eq!(p.limit, 100);
        assert_eq!(p.offset(), 200);

        assert!(PageParams::from_query(&params(&[("page", "0")]), &config).is_err());
        assert!(PageParams::from_query(&params(&[("limit", "x")]), &config).is_err());
    }

    #[test]
    fn test_page_links() {
        let p = PageParams { page: 2, limit: 2 };
        let page = Page::from_vec(vec![1, 2, 3, 4, 5], p);
        assert_eq!(page.results, vec![3, 4]);
        assert_eq!(page.count, 5);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let last = Page::from_vec(vec![1, 2, 3], PageParams { page: 2, limit: 2 });
        assert_eq!(last.next, None);
        assert_eq!(last.results, vec![3]);
    }

    #[test]
    fn test_huge_page_number() {
        let config = PaginationConfig::default();
        let query = params(&[("page", "9223372036854775807")]);
        let p = PageParams::from_query(&query, &config).unwrap();
        assert_eq!(p.offset(), i64::MAX);

        let page: Page<i64> = Page::new(Vec::new(), 3, p);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(i64::MAX - 1));
        assert!(Page::from_vec(vec![1, 2, 3], p).results.is_empty());
    }

    #[test]
    fn test_query_params() {
        let q = params(&[("tags", "lunch"), ("tags", "dinner"), ("is_favorited", "1"), ("author", "")]);
        assert_eq!(q.get_all("tags"), vec!["lunch", "dinner"]);
        assert!(q.flag("is_favorited"));
        assert!(!q.flag("is_in_shopping_cart"));
        assert_eq!(q.get_i64("author").unwrap(), None);
    }
}
