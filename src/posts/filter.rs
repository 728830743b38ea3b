use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

/// Query parameters recognized by `GET /posts`. Unknown keys are ignored,
/// absent keys impose no constraint, and non-numeric values for the numeric
/// keys are rejected at the boundary by the `Query` extractor.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingQuery {
    pub city: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub property: Option<String>,
    pub bedroom: Option<i64>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
}

impl ListingQuery {
    /// Appends a `WHERE` clause covering every present key. An empty query
    /// appends nothing and matches everything.
    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        let mut sep = " WHERE ";

        if let Some(city) = &self.city {
            qb.push(std::mem::replace(&mut sep, " AND "));
            qb.push("instr(lower(p.city), lower(")
                .push_bind(city.clone())
                .push(")) > 0");
        }
        if let Some(kind) = &self.kind {
            qb.push(std::mem::replace(&mut sep, " AND "));
            qb.push("p.type = ").push_bind(kind.clone());
        }
        if let Some(property) = &self.property {
            qb.push(std::mem::replace(&mut sep, " AND "));
            qb.push("p.property = ").push_bind(property.clone());
        }
        if let Some(bedroom) = self.bedroom {
            qb.push(std::mem::replace(&mut sep, " AND "));
            qb.push("p.bedroom >= ").push_bind(bedroom);
        }
        if let Some(min_price) = self.min_price {
            qb.push(std::mem::replace(&mut sep, " AND "));
            qb.push("p.price >= ").push_bind(min_price);
        }
        if let Some(max_price) = self.max_price {
            qb.push(std::mem::replace(&mut sep, " AND "));
            qb.push("p.price <= ").push_bind(max_price);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(query: ListingQuery) -> String {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM posts p");
        query.push_predicate(&mut qb);
        qb.into_sql()
    }

    #[test]
    fn empty_query_adds_no_predicate() {
        assert_eq!(sql_for(ListingQuery::default()), "SELECT * FROM posts p");
    }

    #[test]
    fn city_filter_is_case_insensitive_substring() {
        let sql = sql_for(ListingQuery {
            city: Some("ber".to_owned()),
            ..Default::default()
        });
        assert!(sql.contains("instr(lower(p.city), lower("));
    }

    #[test]
    fn price_bounds_combine_with_and() {
        let sql = sql_for(ListingQuery {
            min_price: Some(500),
            max_price: Some(1500),
            ..Default::default()
        });
        assert!(sql.contains("p.price >= "));
        assert!(sql.contains(" AND p.price <= "));
    }

    #[test]
    fn all_keys_chain_into_one_where_clause() {
        let sql = sql_for(ListingQuery {
            city: Some("Berlin".to_owned()),
            kind: Some("rent".to_owned()),
            property: Some("apartment".to_owned()),
            bedroom: Some(2),
            min_price: Some(500),
            max_price: Some(1500),
        });
        assert_eq!(sql.matches(" WHERE ").count(), 1);
        assert_eq!(sql.matches(" AND ").count(), 5);
        assert!(sql.contains("p.type = "));
        assert!(sql.contains("p.bedroom >= "));
    }

    #[test]
    fn unknown_keys_are_ignored_by_the_boundary() {
        let query: ListingQuery =
            serde_urlencoded_from("city=Berlin&furnished=yes&minPrice=700");
        assert_eq!(query.city.as_deref(), Some("Berlin"));
        assert_eq!(query.min_price, Some(700));
        assert_eq!(query.bedroom, None);
    }

    #[test]
    fn non_numeric_value_for_numeric_key_is_a_parse_failure() {
        let parsed: Result<ListingQuery, _> = serde_urlencoded::from_str("bedroom=lots");
        assert!(parsed.is_err());
    }

    fn serde_urlencoded_from(input: &str) -> ListingQuery {
        serde_urlencoded::from_str(input).unwrap()
    }
}
