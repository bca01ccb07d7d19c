//! Query construction for the BOAMP `records` endpoint
//!
//! Turns caller-supplied search criteria into the four query parameters the
//! backend understands (`where`, `order_by`, `limit`, `refine`). Everything
//! here is a pure function of its inputs; "today" is passed in by the caller.

use chrono::NaiveDate;

use crate::market::{
    MarketType, SortOrder, FIELD_DATE_LIMITE, FIELD_DEPARTEMENT, FIELD_DESCRIPTEUR,
    FIELD_IDWEB, FIELD_OBJET, FIELD_TYPE_MARCHE,
};

pub const DEFAULT_LIMIT: u32 = 20;
pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 100;

/// Clamp a caller-provided limit into `[MIN_LIMIT, MAX_LIMIT]`
pub fn resolve_limit(limit: Option<i64>) -> u32 {
    match limit {
        None => DEFAULT_LIMIT,
        Some(n) => n.clamp(MIN_LIMIT as i64, MAX_LIMIT as i64) as u32,
    }
}

fn clean_values(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Fully resolved search criteria
///
/// Built once per call through [`SearchParams::new`], which applies every
/// default and normalisation rule. Fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    keywords: Vec<String>,
    market_type: Option<MarketType>,
    limit: u32,
    sort: SortOrder,
    departments: Vec<String>,
}

impl SearchParams {
    pub fn new(
        keywords: Option<Vec<String>>,
        market_type: Option<MarketType>,
        limit: Option<i64>,
        sort: Option<&str>,
        departments: Option<Vec<String>>,
    ) -> Self {
        Self {
            keywords: clean_values(keywords),
            market_type,
            limit: resolve_limit(limit),
            sort: SortOrder::resolve(sort),
            departments: clean_values(departments),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn market_type(&self) -> Option<MarketType> {
        self.market_type
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn departments(&self) -> &[String] {
        &self.departments
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::new(None, None, None, None, None)
    }
}

// ============================================================================
// Escaping
// ============================================================================

/// Escape a value for use inside a quoted ODSQL string literal
///
/// Backslashes and the delimiting quote are backslash-escaped so a value can
/// never close the literal it sits in.
pub fn escape_literal(value: &str, quote: char) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == quote {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ============================================================================
// Filter expression
// ============================================================================

fn keyword_clause(keyword: &str) -> String {
    let kw = escape_literal(keyword, '\'');
    format!("({FIELD_OBJET} LIKE '%{kw}%' OR {FIELD_DESCRIPTEUR} LIKE '%{kw}%')")
}

fn department_clause(code: &str) -> String {
    format!("{FIELD_DEPARTEMENT}=\"{}\"", escape_literal(code, '"'))
}

/// Build the `where` expression for a search
///
/// Shape: `[(kw1 OR kw2 ...) AND ] deadline >= today [AND (dept1 OR ...)]`.
/// The deadline clause is always present so closed notices never come back.
pub fn build_where_clause(keywords: &[String], departments: &[String], today: NaiveDate) -> String {
    let mut clauses = Vec::with_capacity(3);

    match keywords {
        [] => {}
        // A lone keyword group is already parenthesized
        [keyword] => clauses.push(keyword_clause(keyword)),
        _ => {
            let groups: Vec<String> = keywords.iter().map(|k| keyword_clause(k)).collect();
            clauses.push(format!("({})", groups.join(" OR ")));
        }
    }

    clauses.push(format!(
        "{FIELD_DATE_LIMITE} >= date'{}'",
        today.format("%Y-%m-%d")
    ));

    if !departments.is_empty() {
        let codes: Vec<String> = departments.iter().map(|d| department_clause(d)).collect();
        clauses.push(format!("({})", codes.join(" OR ")));
    }

    clauses.join(" AND ")
}

/// `where` expression for an exact identifier lookup
pub fn build_details_where(idweb: &str) -> String {
    format!("{FIELD_IDWEB}=\"{}\"", escape_literal(idweb, '"'))
}

/// Facet refinement selecting a market type
pub fn build_refine(market_type: MarketType) -> String {
    format!("{FIELD_TYPE_MARCHE}:{}", market_type.facet_value())
}

// ============================================================================
// Outbound request parameters
// ============================================================================

/// Query-string parameters for one request to the `records` endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordsQuery {
    pub where_clause: String,
    pub order_by: Option<String>,
    pub limit: Option<u32>,
    pub refine: Option<String>,
}

impl RecordsQuery {
    /// Key/value pairs in the order they are sent
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("where", self.where_clause.clone())];
        if let Some(order_by) = &self.order_by {
            pairs.push(("order_by", order_by.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(refine) = &self.refine {
            pairs.push(("refine", refine.clone()));
        }
        pairs
    }
}

/// Build the full search request for the given criteria and date
pub fn build_search_query(params: &SearchParams, today: NaiveDate) -> RecordsQuery {
    RecordsQuery {
        where_clause: build_where_clause(params.keywords(), params.departments(), today),
        order_by: Some(params.sort().as_str().to_string()),
        limit: Some(params.limit()),
        refine: params.market_type().map(build_refine),
    }
}

/// Build the request fetching a single market by identifier
pub fn build_details_query(idweb: &str) -> RecordsQuery {
    RecordsQuery {
        where_clause: build_details_where(idweb),
        order_by: None,
        limit: None,
        refine: None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_single_keyword_search() {
        let params = SearchParams::new(Some(strings(&["informatique"])), None, None, None, None);
        let query = build_search_query(&params, today());

        assert_eq!(
            query.where_clause,
            "(objet LIKE '%informatique%' OR descripteur_libelle LIKE '%informatique%') \
             AND datelimitereponse >= date'2026-10-17'"
        );
        assert_eq!(query.limit, Some(20));
        assert_eq!(query.order_by.as_deref(), Some("datelimitereponse ASC"));
        assert_eq!(query.refine, None);
    }

    #[test]
    fn test_keywords_are_or_combined() {
        let clause = build_where_clause(&strings(&["voirie", "eclairage"]), &[], today());

        assert_eq!(
            clause,
            "((objet LIKE '%voirie%' OR descripteur_libelle LIKE '%voirie%') OR \
             (objet LIKE '%eclairage%' OR descripteur_libelle LIKE '%eclairage%')) \
             AND datelimitereponse >= date'2026-10-17'"
        );
    }

    #[test]
    fn test_departments_without_keywords() {
        let clause = build_where_clause(&[], &strings(&["75", "92"]), today());

        assert_eq!(
            clause,
            "datelimitereponse >= date'2026-10-17' \
             AND (code_departement=\"75\" OR code_departement=\"92\")"
        );
    }

    #[test]
    fn test_keywords_and_departments() {
        let clause = build_where_clause(&strings(&["nettoyage"]), &strings(&["69"]), today());

        assert_eq!(
            clause,
            "(objet LIKE '%nettoyage%' OR descripteur_libelle LIKE '%nettoyage%') \
             AND datelimitereponse >= date'2026-10-17' \
             AND (code_departement=\"69\")"
        );
    }

    #[test]
    fn test_deadline_clause_always_present() {
        assert_eq!(
            build_where_clause(&[], &[], today()),
            "datelimitereponse >= date'2026-10-17'"
        );
    }

    #[test]
    fn test_blank_keywords_are_dropped() {
        let params = SearchParams::new(
            Some(strings(&["", "  ", " cloud "])),
            None,
            None,
            None,
            Some(strings(&[" "])),
        );

        assert_eq!(params.keywords(), &["cloud".to_string()]);
        assert!(params.departments().is_empty());
    }

    #[test]
    fn test_resolve_limit() {
        assert_eq!(resolve_limit(None), 20);
        assert_eq!(resolve_limit(Some(0)), 1);
        assert_eq!(resolve_limit(Some(-5)), 1);
        assert_eq!(resolve_limit(Some(1)), 1);
        assert_eq!(resolve_limit(Some(57)), 57);
        assert_eq!(resolve_limit(Some(100)), 100);
        assert_eq!(resolve_limit(Some(1000)), 100);
    }

    #[test]
    fn test_unknown_sort_falls_back() {
        let params = SearchParams::new(None, None, None, Some("objet DESC"), None);
        assert_eq!(params.sort(), SortOrder::DeadlineAsc);

        let params = SearchParams::new(None, None, None, Some("dateparution DESC"), None);
        let query = build_search_query(&params, today());
        assert_eq!(query.order_by.as_deref(), Some("dateparution DESC"));
    }

    #[test]
    fn test_market_type_goes_to_refine() {
        let params = SearchParams::new(None, Some(MarketType::Works), Some(5), None, None);
        let query = build_search_query(&params, today());

        assert_eq!(query.refine.as_deref(), Some("type_marche:TRAVAUX"));
        assert!(!query.where_clause.contains("TRAVAUX"));
        assert_eq!(query.limit, Some(5));
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal("l'eau", '\''), "l\\'eau");
        assert_eq!(escape_literal("a\"b", '"'), "a\\\"b");
        assert_eq!(escape_literal("a\"b", '\''), "a\"b");
        assert_eq!(escape_literal("c:\\tmp", '\''), "c:\\\\tmp");
    }

    #[test]
    fn test_keyword_cannot_break_out_of_literal() {
        let clause = build_where_clause(&strings(&["x' OR 1=1 OR objet LIKE '"]), &[], today());

        assert!(clause.contains("LIKE '%x\\' OR 1=1 OR objet LIKE \\'%'"));
    }

    #[test]
    fn test_department_is_escaped() {
        let clause = build_where_clause(&[], &strings(&["75\" OR \"1"]), today());
        assert!(clause.ends_with("(code_departement=\"75\\\" OR \\\"1\")"));
    }

    #[test]
    fn test_details_query() {
        let query = build_details_query("24-98765");
        assert_eq!(query.where_clause, "idweb=\"24-98765\"");
        assert_eq!(query.to_pairs(), vec![("where", "idweb=\"24-98765\"".to_string())]);
    }

    #[test]
    fn test_search_query_pairs_order() {
        let params = SearchParams::new(None, Some(MarketType::Services), Some(3), None, None);
        let pairs = build_search_query(&params, today()).to_pairs();
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| *k).collect();

        assert_eq!(keys, vec!["where", "order_by", "limit", "refine"]);
        assert_eq!(pairs[2].1, "3");
        assert_eq!(pairs[3].1, "type_marche:SERVICES");
    }
}
