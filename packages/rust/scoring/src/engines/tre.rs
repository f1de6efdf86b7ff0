//! Transaction Readiness Engine: whether an AI can confidently send a
//! shopper to this page to buy.
//!
//! | sub-score | max |
//! |---|---|
//! | call to action | 30 |
//! | trust signals | 30 |
//! | contact info | 20 |
//! | payment and shipping | 20 |

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use arrs_shared::{CrawledContent, EngineDetails, EngineScore, Gap, ParsedContent, Result, Severity};

use super::{ScoringEngine, engine_gap, finish_score};
use crate::primitives::contains_any;

pub(crate) const NAME: &str = "TRE";

const CTA_MAX: f64 = 30.0;

const BUY_KEYWORDS: [&str; 8] = [
    "add to cart",
    "add to bag",
    "buy now",
    "purchase",
    "checkout",
    "order now",
    "add to basket",
    "buy",
];
const POLICY_KEYWORDS: [&str; 5] = ["return policy", "returns", "refund", "money back", "guarantee"];
const ADDRESS_KEYWORDS: [&str; 4] = ["address", "contact us", "location", "visit us"];
const PAYMENT_KEYWORDS: [&str; 8] = [
    "visa",
    "mastercard",
    "paypal",
    "payment",
    "credit card",
    "debit card",
    "apple pay",
    "google pay",
];
const SHIPPING_KEYWORDS: [&str; 6] = [
    "shipping",
    "delivery",
    "free shipping",
    "ships to",
    "ship",
    "express delivery",
];

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
});
static PHONE: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").expect("valid regex"),
        Regex::new(r"\(\d{3}\)\s*\d{3}[-.]?\d{4}").expect("valid regex"),
        Regex::new(r"\+\d{1,3}\s*\d{1,14}").expect("valid regex"),
    ]
});

#[derive(Debug, Clone)]
pub struct TreEngine {
    weight: f64,
}

impl TreEngine {
    pub fn new(weight: f64) -> Self {
        Self { weight }
    }
}

fn is_https(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|u| u.scheme() == "https")
}

impl ScoringEngine for TreEngine {
    fn name(&self) -> &str {
        NAME
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn score(&self, content: &CrawledContent, parsed: &ParsedContent) -> Result<EngineScore> {
        let text = parsed.text_content.to_lowercase();
        let data = &parsed.structured_data;

        // Call to action
        let buy_button_found = contains_any(&text, &BUY_KEYWORDS);
        let has_offer = !data.offers.is_empty();
        let complete_offer = data.offers.first().is_some_and(|o| o.has_price_and_currency());
        let mut cta_score: f64 = 0.0;
        if buy_button_found {
            cta_score += 15.0;
        }
        if has_offer {
            cta_score += 15.0;
            if complete_offer {
                cta_score += 5.0;
            }
        }
        let cta_score = cta_score.min(CTA_MAX);

        // Trust signals
        let has_ssl = is_https(&content.final_url);
        let has_reviews = data.reviews.has_reviews;
        let has_policy = contains_any(&text, &POLICY_KEYWORDS);
        let trust_score = [has_ssl, has_reviews, has_policy]
            .iter()
            .filter(|signal| **signal)
            .count() as f64
            * 10.0;

        // Contact info
        let has_email = EMAIL.is_match(&text);
        let has_phone = PHONE.iter().any(|re| re.is_match(&text));
        let has_address = contains_any(&text, &ADDRESS_KEYWORDS);
        let mut contact_score: f64 = 0.0;
        if has_email {
            contact_score += 7.0;
        }
        if has_phone {
            contact_score += 7.0;
        }
        if has_address {
            contact_score += 6.0;
        }

        // Payment and shipping
        let has_payment = contains_any(&text, &PAYMENT_KEYWORDS);
        let has_shipping = contains_any(&text, &SHIPPING_KEYWORDS);
        let payment_score = [has_payment, has_shipping]
            .iter()
            .filter(|signal| **signal)
            .count() as f64
            * 10.0;

        let total = cta_score + trust_score + contact_score + payment_score;
        debug!(
            analysis_id = %content.analysis_id,
            cta_score, trust_score, contact_score, payment_score, total,
            "TRE scored"
        );

        let details = EngineDetails::new()
            .with("cta_score", cta_score)
            .with("trust_score", trust_score)
            .with("contact_score", contact_score)
            .with("payment_score", payment_score)
            .with("buy_button_found", buy_button_found)
            .with("has_offer", has_offer)
            .with("has_ssl", has_ssl)
            .with("has_reviews", has_reviews)
            .with("has_return_policy", has_policy)
            .with("has_email", has_email)
            .with("has_phone", has_phone);

        finish_score(self, content, total, details)
    }

    fn identify_gaps(&self, score: &EngineScore, _parsed: &ParsedContent) -> Vec<Gap> {
        let details = &score.details;
        let mut gaps = Vec::new();

        if !details.flag("buy_button_found") {
            gaps.push(engine_gap(
                score,
                "no_buy_button",
                Severity::Critical,
                "No clear call-to-action (buy button/add to cart) detected",
                "Add a prominent 'Add to Cart' or 'Buy Now' button for AI to recognize purchase capability",
            ));
        }

        if !details.flag("has_offer") {
            gaps.push(engine_gap(
                score,
                "missing_offer_schema",
                Severity::High,
                "Offer schema missing from Product markup",
                "Add Offer schema with price, currency, and availability information",
            ));
        }

        if !details.flag("has_reviews") {
            gaps.push(engine_gap(
                score,
                "no_reviews",
                Severity::Medium,
                "No review or rating information found",
                "Add AggregateRating or Review schema to build trust signals",
            ));
        }

        if !details.flag("has_ssl") {
            gaps.push(engine_gap(
                score,
                "no_ssl",
                Severity::Critical,
                "Site not using HTTPS (SSL)",
                "Enable HTTPS for secure transactions and improved trust",
            ));
        }

        if !details.flag("has_email") && !details.flag("has_phone") {
            gaps.push(engine_gap(
                score,
                "no_contact_info",
                Severity::High,
                "No contact information (email or phone) found",
                "Add visible contact information to build customer trust",
            ));
        }

        gaps
    }
}
