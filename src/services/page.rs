use serde::{Deserialize, Serialize};

/// One window of a filtered listing plus the totals needed to navigate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        Self { items, total, page, limit, total_pages: total_pages(total, limit) }
    }
}

/// `ceil(total / limit)`; zero exactly when there is nothing to show.
pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total / limit + u64::from(total % limit != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(23, 10), 3);
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(1, 100), 1);
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(u64::MAX, 2), u64::MAX / 2 + 1);
    }

    #[test]
    fn serializes_total_pages_in_camel_case() {
        let page = PageResult::new(vec![1, 2, 3], 23, 3, 10);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalPages"], 3);
        assert_eq!(json["items"].as_array().unwrap().len(), 3);
        assert!(json.get("total_pages").is_none());
    }
}
