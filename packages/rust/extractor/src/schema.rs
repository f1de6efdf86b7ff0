//! Schema.org structured data: JSON-LD and microdata extraction, then
//! Product / Organization / Offer / Review / brand resolution.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

use arrs_shared::{Offer, ProductValidation, ReviewSummary, StructuredData, is_truthy};

use crate::html::element_text;

static JSON_LD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid selector")
});
static TOP_LEVEL_ITEMS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[itemscope]:not([itemprop])").expect("valid selector"));

pub(crate) fn structured_data(doc: &Html) -> StructuredData {
    let json_ld = json_ld_objects(doc);
    let microdata: Vec<Value> = doc.select(&TOP_LEVEL_ITEMS).map(read_item).collect();

    let find = |type_name: &str| {
        json_ld
            .iter()
            .chain(microdata.iter())
            .find(|item| has_type(item, type_name))
            .cloned()
    };
    let product = find("Product");
    let organization = find("Organization");

    let product_validation = product
        .as_ref()
        .map(ProductValidation::of)
        .unwrap_or_else(ProductValidation::absent);
    let offers = product.as_ref().map(resolve_offers).unwrap_or_default();
    let reviews = product.as_ref().map(resolve_reviews).unwrap_or_default();
    let brand = resolve_brand(product.as_ref(), organization.as_ref());

    StructuredData {
        json_ld,
        microdata,
        product,
        organization,
        product_validation,
        offers,
        reviews,
        brand,
    }
}

// ---------------------------------------------------------------------------
// JSON-LD
// ---------------------------------------------------------------------------

fn json_ld_objects(doc: &Html) -> Vec<Value> {
    let mut objects = Vec::new();
    for script in doc.select(&JSON_LD) {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => flatten_into(value, &mut objects),
            Err(e) => debug!(error = %e, "skipping malformed JSON-LD block"),
        }
    }
    objects
}

/// Unwrap top-level arrays and `@graph` containers into individual objects.
fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| flatten_into(v, out)),
        Value::Object(mut obj) => {
            if let Some(graph) = obj.remove("@graph") {
                flatten_into(graph, out);
                if obj.contains_key("@type") {
                    out.push(Value::Object(obj));
                }
            } else {
                out.push(Value::Object(obj));
            }
        }
        _ => {}
    }
}

/// Whether `@type` names `type_name`, as a string or within an array.
/// IRI forms such as `http://schema.org/Product` match on their last segment.
fn has_type(item: &Value, type_name: &str) -> bool {
    let matches = |v: &Value| {
        v.as_str().is_some_and(|t| {
            let short = t.rsplit(['/', ':', '#']).next().unwrap_or(t);
            short == type_name
        })
    };
    match item.get("@type") {
        Some(Value::Array(types)) => types.iter().any(matches),
        Some(v) => matches(v),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Microdata
// ---------------------------------------------------------------------------

/// Convert an `itemscope` element into a JSON-LD-shaped object.
fn read_item(item: ElementRef<'_>) -> Value {
    let mut props = Map::new();
    if let Some(item_type) = item.value().attr("itemtype") {
        let first = item_type.split_whitespace().next().unwrap_or(item_type);
        let short = first.rsplit('/').next().unwrap_or(first);
        props.insert("@type".into(), Value::String(short.to_string()));
    }
    collect_props(item, &mut props);
    Value::Object(props)
}

fn collect_props(el: ElementRef<'_>, props: &mut Map<String, Value>) {
    for child in el.children().filter_map(ElementRef::wrap) {
        let element = child.value();
        let is_scope = element.attr("itemscope").is_some();

        if let Some(names) = element.attr("itemprop") {
            let value = if is_scope {
                read_item(child)
            } else {
                Value::String(prop_value(child))
            };
            for name in names.split_whitespace() {
                insert_multi(props, name, value.clone());
            }
        }

        // Nested scopes own their descendants.
        if !is_scope {
            collect_props(child, props);
        }
    }
}

fn prop_value(el: ElementRef<'_>) -> String {
    let element = el.value();
    let attr = match element.name() {
        "meta" => element.attr("content"),
        "a" | "link" | "area" => element.attr("href"),
        "img" | "audio" | "video" | "source" | "embed" | "iframe" => element.attr("src"),
        "time" => element.attr("datetime"),
        "data" | "meter" => element.attr("value"),
        _ => element.attr("content"),
    };
    attr.map(|a| a.trim().to_string())
        .unwrap_or_else(|| element_text(el))
}

/// Repeated properties become arrays.
fn insert_multi(props: &mut Map<String, Value>, name: &str, value: Value) {
    match props.get_mut(name) {
        Some(Value::Array(existing)) => existing.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            props.insert(name.to_string(), value);
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// `offers` as a list; a single object becomes a one-element list.
fn resolve_offers(product: &Value) -> Vec<Offer> {
    let items: Vec<&Value> = match product.get("offers") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter(|o| o.is_object())
        .map(|o| Offer {
            price: scalar_text(o.get("price").or_else(|| o.get("lowPrice"))),
            price_currency: scalar_text(o.get("priceCurrency")),
            availability: scalar_text(o.get("availability")),
            url: scalar_text(o.get("url")),
        })
        .collect()
}

fn resolve_reviews(product: &Value) -> ReviewSummary {
    let aggregate = product.get("aggregateRating").filter(|v| is_truthy(v));
    let review_count = match product.get("review") {
        Some(Value::Array(items)) => items.len(),
        Some(v) if is_truthy(v) => 1,
        _ => 0,
    };

    ReviewSummary {
        has_reviews: aggregate.is_some() || review_count > 0,
        review_count: Some(review_count as u64),
        rating_value: aggregate.and_then(|a| number(a.get("ratingValue"))),
        rating_count: aggregate
            .and_then(|a| number(a.get("ratingCount").or_else(|| a.get("reviewCount"))))
            .map(|n| n as u64),
    }
}

/// Product brand (object name or plain string), else the Organization name.
fn resolve_brand(product: Option<&Value>, organization: Option<&Value>) -> Option<String> {
    let from_product = product.and_then(|p| p.get("brand")).and_then(|brand| match brand {
        Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
        Value::String(s) => Some(s.clone()),
        _ => None,
    });

    from_product
        .or_else(|| {
            organization
                .and_then(|o| o.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
