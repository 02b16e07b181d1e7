use eclog_parser::schema;
use polars::prelude::DataFrame;

use crate::error::Result;
use crate::rules::{
    apply_single_label, impl_label_text, CaseMode, CategoryLabel, Predicate, RuleSet,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UriType {
    Product,
    Category,
    Search,
    StaticResource,
    Checkout,
    Other,
}

impl CategoryLabel for UriType {
    const ALL: &'static [Self] = &[
        UriType::Product,
        UriType::Category,
        UriType::Search,
        UriType::StaticResource,
        UriType::Checkout,
        UriType::Other,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            UriType::Product => "Product",
            UriType::Category => "Category",
            UriType::Search => "Search",
            UriType::StaticResource => "Static Resource",
            UriType::Checkout => "Checkout",
            UriType::Other => "Other",
        }
    }
}

impl_label_text!(UriType);

/// Request-path taxonomy of the shop. Matching is case-sensitive; `szukaj`, `wyszukiwanie`
/// and `zamowienie` are the Polish search and order tokens used by the storefront.
#[derive(Debug, Clone)]
pub struct UriClassifier {
    rules: RuleSet<UriType>,
}

impl Default for UriClassifier {
    fn default() -> Self {
        let rules = RuleSet::new(UriType::Other, CaseMode::Sensitive)
            .rule(UriType::Product, Predicate::contains("p-"))
            .rule(UriType::Category, Predicate::contains("c-"))
            .rule(
                UriType::Search,
                Predicate::contains_any(&["search", "szukaj=", "/wyszukiwanie-"]),
            )
            .rule(
                UriType::StaticResource,
                Predicate::ends_with_any(&[".jpg", ".png", ".css", ".js"]),
            )
            .rule(
                UriType::Checkout,
                Predicate::contains_any(&["cart", "checkout", "zamowienie"]),
            );
        Self { rules }
    }
}

impl UriClassifier {
    pub fn rules(&self) -> &RuleSet<UriType> {
        &self.rules
    }

    pub fn classify(&self, uri: Option<&str>) -> UriType {
        uri.map_or(self.rules.fallback(), |uri| self.rules.classify(uri))
    }

    pub fn apply(&self, df: &mut DataFrame, column: &str) -> Result<()> {
        apply_single_label(df, column, schema::URI_TYPE, |uri| self.classify(uri))
    }
}
