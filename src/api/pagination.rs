use serde::de::DeserializeOwned;
use serde_json::Value;

/// One page of a Google list response.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

/// Split a Google list response into its items and continuation token.
///
/// Google list endpoints put the items under a resource-specific key
/// (`courses`, `courseWork`, `items`, ...) and omit the key entirely when
/// the page is empty. An empty `nextPageToken` ends the listing.
pub fn parse_page<T: DeserializeOwned>(
    mut body: Value,
    field: &str,
) -> Result<Page<T>, serde_json::Error> {
    let items = match body.get_mut(field).map(Value::take) {
        Some(Value::Null) | None => Vec::new(),
        Some(raw) => serde_json::from_value(raw)?,
    };
    let next_page_token = body
        .get("nextPageToken")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    Ok(Page {
        items,
        next_page_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_items_and_token() {
        let page: Page<u32> =
            parse_page(json!({"courses": [1, 2], "nextPageToken": "abc"}), "courses").unwrap();
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn missing_field_is_an_empty_page() {
        let page: Page<u32> = parse_page(json!({}), "courseWork").unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn empty_token_ends_listing() {
        let page: Page<u32> =
            parse_page(json!({"items": [], "nextPageToken": ""}), "items").unwrap();
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn wrong_item_shape_is_an_error() {
        let res: Result<Page<u32>, _> = parse_page(json!({"items": ["x"]}), "items");
        assert!(res.is_err());
    }
}
