use crate::job_models::{bool_or_false, opt_str, push_non_empty, str_or_empty, string_list};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Query for `GET /search` on Local Business Data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalBusinessSearchParams {
    pub query: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub extract_emails_and_contacts: Option<bool>,
    #[serde(default)]
    pub fields: Option<String>,
    #[serde(default)]
    pub subtypes: Option<String>,
    #[serde(default)]
    pub business_status: Option<String>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub zoom: Option<String>,
}

impl LocalBusinessSearchParams {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("query", self.query.clone())];

        if let Some(lat) = self.lat {
            pairs.push(("lat", lat.to_string()));
        }
        if let Some(lng) = self.lng {
            pairs.push(("lng", lng.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        push_non_empty(&mut pairs, "region", self.region.as_deref());
        push_non_empty(&mut pairs, "language", self.language.as_deref());
        if let Some(extract) = self.extract_emails_and_contacts {
            pairs.push(("extract_emails_and_contacts", extract.to_string()));
        }
        push_non_empty(&mut pairs, "fields", self.fields.as_deref());
        push_non_empty(&mut pairs, "subtypes", self.subtypes.as_deref());
        push_non_empty(&mut pairs, "business_status", self.business_status.as_deref());
        if let Some(verified) = self.verified {
            pairs.push(("verified", verified.to_string()));
        }
        push_non_empty(&mut pairs, "zoom", self.zoom.as_deref());

        pairs
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LocalBusinessSearchResponse {
    pub status: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Provider keys copied into named fields; anything else lands in `extra`.
const KNOWN_FIELDS: &[&str] = &[
    "business_id",
    "name",
    "address",
    "street_address",
    "full_address",
    "phone_number",
    "rating",
    "review_count",
    "type",
    "subtypes",
    "business_status",
    "website",
    "latitude",
    "longitude",
    "opening_status",
    "working_hours",
    "verified",
    "place_link",
    "reviews_link",
    "district",
    "city",
    "state",
    "country",
    "zipcode",
    "price_level",
    "photo_count",
    "photos_sample",
    "about",
    "emails_and_contacts",
];

/// Display record for a local business.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "Value")]
pub struct LocalBusinessDisplay {
    pub business_id: String,
    pub name: String,
    pub address: String,
    pub full_address: String,
    pub phone_number: Option<String>,
    pub rating: f64,
    pub review_count: u64,
    #[serde(rename = "type")]
    pub business_type: String,
    pub subtypes: Vec<String>,
    pub business_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<Value>,
    pub verified: bool,
    pub place_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photos_sample: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emails_and_contacts: Option<Value>,
    /// Provider fields without a dedicated slot.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Value> for LocalBusinessDisplay {
    fn from(value: Value) -> Self {
        Self::from_raw(&value)
    }
}

impl LocalBusinessDisplay {
    pub fn from_raw(business: &Value) -> Self {
        let address = opt_str(business, "address")
            .filter(|a| !a.is_empty())
            .or_else(|| opt_str(business, "street_address"))
            .unwrap_or_default();

        let extra = business
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter(|(k, _)| !KNOWN_FIELDS.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            business_id: str_or_empty(business, "business_id"),
            name: str_or_empty(business, "name"),
            address,
            full_address: str_or_empty(business, "full_address"),
            phone_number: opt_str(business, "phone_number"),
            rating: business.get("rating").and_then(Value::as_f64).unwrap_or(0.0),
            review_count: business
                .get("review_count")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            business_type: str_or_empty(business, "type"),
            subtypes: string_list(business.get("subtypes")).unwrap_or_default(),
            business_status: str_or_empty(business, "business_status"),
            website: opt_str(business, "website"),
            latitude: business.get("latitude").and_then(Value::as_f64).unwrap_or(0.0),
            longitude: business.get("longitude").and_then(Value::as_f64).unwrap_or(0.0),
            opening_status: opt_str(business, "opening_status"),
            working_hours: non_null(business, "working_hours"),
            verified: bool_or_false(business, "verified"),
            place_link: str_or_empty(business, "place_link"),
            reviews_link: opt_str(business, "reviews_link"),
            district: opt_str(business, "district"),
            city: opt_str(business, "city"),
            state: opt_str(business, "state"),
            country: opt_str(business, "country"),
            zipcode: opt_str(business, "zipcode"),
            price_level: opt_str(business, "price_level"),
            photo_count: business.get("photo_count").and_then(Value::as_u64),
            photos_sample: non_null(business, "photos_sample"),
            about: non_null(business, "about"),
            emails_and_contacts: non_null(business, "emails_and_contacts"),
            extra,
        }
    }

    /// Full address when known, otherwise the short address.
    pub fn best_address(&self) -> &str {
        if self.full_address.is_empty() {
            &self.address
        } else {
            &self.full_address
        }
    }
}

fn non_null(record: &Value, key: &str) -> Option<Value> {
    record.get(key).filter(|v| !v.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_address_fallbacks() {
        let with_street = LocalBusinessDisplay::from_raw(&json!({
            "name": "Cafe",
            "street_address": "1 Main St"
        }));
        assert_eq!(with_street.address, "1 Main St");
        assert_eq!(with_street.best_address(), "1 Main St");

        let with_both = LocalBusinessDisplay::from_raw(&json!({
            "address": "2 Side St",
            "street_address": "1 Main St",
            "full_address": "2 Side St, Springfield"
        }));
        assert_eq!(with_both.address, "2 Side St");
        assert_eq!(with_both.best_address(), "2 Side St, Springfield");

        let neither = LocalBusinessDisplay::from_raw(&json!({}));
        assert_eq!(neither.address, "");
        assert!(neither.subtypes.is_empty());
    }

    #[test]
    fn test_unknown_fields_kept_in_extra() {
        let display = LocalBusinessDisplay::from_raw(&json!({
            "business_id": "0x1",
            "type": "Coffee shop",
            "google_id": "g-1",
            "tld": ".com",
            "rating": 4.5,
            "review_count": 120
        }));
        assert_eq!(display.business_type, "Coffee shop");
        assert_eq!(display.extra.get("google_id"), Some(&json!("g-1")));
        assert!(display.extra.get("rating").is_none());

        let serialized = serde_json::to_value(&display).unwrap();
        assert_eq!(serialized["type"], "Coffee shop");
        assert_eq!(serialized["tld"], ".com");
        assert_eq!(serialized["review_count"], 120);
    }

    #[test]
    fn test_deserialize_partial_record() {
        let parsed: LocalBusinessDisplay =
            serde_json::from_value(json!({"name": "Bakery", "subtypes": ["Bakery", "Cafe"]}))
                .unwrap();
        assert_eq!(parsed.name, "Bakery");
        assert_eq!(parsed.subtypes.len(), 2);
        assert_eq!(parsed.rating, 0.0);
    }

    #[test]
    fn test_query_pairs() {
        let params = LocalBusinessSearchParams {
            query: "plumbers in austin".to_string(),
            limit: Some(20),
            region: Some("us".to_string()),
            verified: Some(true),
            zoom: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            params.to_query_pairs(),
            vec![
                ("query", "plumbers in austin".to_string()),
                ("limit", "20".to_string()),
                ("region", "us".to_string()),
                ("verified", "true".to_string()),
            ]
        );
    }
}
