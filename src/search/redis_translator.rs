// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Translates a [`SearchRequest`] into RediSearch FT.SEARCH syntax.
//!
//! # RediSearch Query Syntax
//!
//! ```text
//! @name|description:(terms)  - full-text over both fields
//! @price:[min max]           - numeric range (-inf/+inf when unbounded)
//! @category:{value}          - tag exact match
//! clause clause              - AND (implicit)
//! ```
//!
//! Name boosting lives in the schema (`WEIGHT 2.0` on `name`), so the text
//! clause itself stays symmetric. Sorting by name targets the `name_sort`
//! field, the non-tokenized sortable copy of the name.

use super::query::{SearchRequest, Sort, SortDirection, SortField};

pub struct RediSearchTranslator;

impl RediSearchTranslator {
    /// Build the FT.SEARCH filter expression.
    ///
    /// The caller guarantees at least one filter; with none this would
    /// degenerate to `*`, which the validation layer refuses upstream.
    pub fn filter(request: &SearchRequest) -> String {
        let mut clauses = Vec::new();

        if let Some(ref text) = request.text {
            clauses.push(format!(
                "@name|description:({})",
                Self::escape_terms(text)
            ));
        }
        if request.min_price.is_some() || request.max_price.is_some() {
            let min = request
                .min_price
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-inf".to_string());
            let max = request
                .max_price
                .map(|v| v.to_string())
                .unwrap_or_else(|| "+inf".to_string());
            clauses.push(format!("@price:[{} {}]", min, max));
        }
        if let Some(ref category) = request.category {
            clauses.push(format!("@category:{{{}}}", Self::escape_tag(category)));
        }

        if clauses.is_empty() {
            "*".to_string()
        } else {
            clauses.join(" ")
        }
    }

    /// SORTBY arguments, or `None` for relevance order (RediSearch's default
    /// is score descending when no SORTBY is given).
    pub fn sort_by(sort: &Sort) -> Option<(&'static str, &'static str)> {
        let field = match sort.field {
            SortField::Relevance => return None,
            SortField::Name => "name_sort",
            SortField::Price => "price",
            SortField::Quantity => "quantity",
        };
        let direction = match sort.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        Some((field, direction))
    }

    /// Escape special characters, preserving spaces so multi-word text keeps
    /// its terms.
    fn escape_terms(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '@' | ':' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '*' | '%' | '-' | '+' => {
                    escaped.push('\\');
                    escaped.push(c);
                }
                _ => escaped.push(c),
            }
        }
        escaped
    }

    /// Escape everything including spaces (tag values are single terms).
    fn escape_tag(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '@' | ':' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '*' | '%' | '-' | '+'
                | ' ' => {
                    escaped.push('\\');
                    escaped.push(c);
                }
                _ => escaped.push(c),
            }
        }
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SearchRequest {
        SearchRequest {
            text: None,
            min_price: None,
            max_price: None,
            category: None,
            sort: Sort::default(),
            limit: 10,
            skip: 0,
        }
    }

    #[test]
    fn test_text_searches_both_fields() {
        let mut r = request();
        r.text = Some("blue widget".to_string());
        assert_eq!(
            RediSearchTranslator::filter(&r),
            "@name|description:(blue widget)"
        );
    }

    #[test]
    fn test_price_range() {
        let mut r = request();
        r.min_price = Some(5.0);
        r.max_price = Some(20.0);
        assert_eq!(RediSearchTranslator::filter(&r), "@price:[5 20]");
    }

    #[test]
    fn test_unbounded_price_range() {
        let mut r = request();
        r.max_price = Some(20.0);
        assert_eq!(RediSearchTranslator::filter(&r), "@price:[-inf 20]");

        let mut r = request();
        r.min_price = Some(5.0);
        assert_eq!(RediSearchTranslator::filter(&r), "@price:[5 +inf]");
    }

    #[test]
    fn test_category_tag() {
        let mut r = request();
        r.category = Some("hand tools".to_string());
        assert_eq!(RediSearchTranslator::filter(&r), "@category:{hand\\ tools}");
    }

    #[test]
    fn test_combined_filters_are_anded() {
        let mut r = request();
        r.text = Some("widget".to_string());
        r.min_price = Some(1.0);
        r.category = Some("tools".to_string());
        assert_eq!(
            RediSearchTranslator::filter(&r),
            "@name|description:(widget) @price:[1 +inf] @category:{tools}"
        );
    }

    #[test]
    fn test_special_chars_escaped() {
        let mut r = request();
        r.text = Some("usb-c (fast)".to_string());
        assert_eq!(
            RediSearchTranslator::filter(&r),
            "@name|description:(usb\\-c \\(fast\\))"
        );
    }

    #[test]
    fn test_sort_by_mapping() {
        assert_eq!(RediSearchTranslator::sort_by(&Sort::default()), None);

        let sort = Sort {
            field: SortField::Name,
            direction: SortDirection::Asc,
        };
        assert_eq!(
            RediSearchTranslator::sort_by(&sort),
            Some(("name_sort", "ASC"))
        );

        let sort = Sort {
            field: SortField::Price,
            direction: SortDirection::Desc,
        };
        assert_eq!(RediSearchTranslator::sort_by(&sort), Some(("price", "DESC")));
    }
}
