use eclog_parser::schema;
use polars::prelude::DataFrame;

use crate::error::Result;
use crate::rules::{
    apply_single_label, impl_label_text, CaseMode, CategoryLabel, Predicate, RuleSet,
};

pub const DEFAULT_INTERNAL_DOMAIN: &str = "shop.our-internet-company.pl";
pub const NO_REFERRER: &str = "-";

const SEARCH_ENGINES: [&str; 3] = ["google", "bing", "yahoo"];
const SOCIAL_NETWORKS: [&str; 3] = ["facebook", "twitter", "instagram"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferrerType {
    Direct,
    Internal,
    SearchEngine,
    SocialMedia,
    OtherExternal,
    Unknown,
}

impl CategoryLabel for ReferrerType {
    const ALL: &'static [Self] = &[
        ReferrerType::Direct,
        ReferrerType::Internal,
        ReferrerType::SearchEngine,
        ReferrerType::SocialMedia,
        ReferrerType::OtherExternal,
        ReferrerType::Unknown,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ReferrerType::Direct => "Direct",
            ReferrerType::Internal => "Internal",
            ReferrerType::SearchEngine => "Search Engine",
            ReferrerType::SocialMedia => "Social Media",
            ReferrerType::OtherExternal => "Other External",
            ReferrerType::Unknown => "Unknown",
        }
    }
}

impl_label_text!(ReferrerType);

#[derive(Debug, Clone)]
pub struct ReferrerClassifier {
    rules: RuleSet<ReferrerType>,
}

impl Default for ReferrerClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_INTERNAL_DOMAIN)
    }
}

impl ReferrerClassifier {
    pub fn new(internal_domain: &str) -> Self {
        let rules = RuleSet::new(ReferrerType::Unknown, CaseMode::Sensitive)
            .rule(ReferrerType::Direct, Predicate::equals(NO_REFERRER))
            .rule(ReferrerType::Internal, Predicate::contains(internal_domain))
            .rule(ReferrerType::SearchEngine, Predicate::contains_any(&SEARCH_ENGINES))
            .rule(ReferrerType::SocialMedia, Predicate::contains_any(&SOCIAL_NETWORKS))
            .rule(ReferrerType::OtherExternal, Predicate::contains("http"));
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet<ReferrerType> {
        &self.rules
    }

    /// A missing referrer is a direct visit, same as the `-` sentinel.
    pub fn classify(&self, referrer: Option<&str>) -> ReferrerType {
        match referrer {
            None => ReferrerType::Direct,
            Some(referrer) => self.rules.classify(referrer),
        }
    }

    pub fn apply(&self, df: &mut DataFrame, column: &str) -> Result<()> {
        apply_single_label(df, column, schema::REFERRER_TYPE, |referrer| {
            self.classify(referrer)
        })
    }
}
