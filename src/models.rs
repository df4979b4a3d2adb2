use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::classifier::PriceResult;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(default, alias = "_id", deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ticket_types: Vec<TicketType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_price")]
    pub price: f64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_opt_price"
    )]
    pub early_bird_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_bird_end: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_active: bool,
}

/// What a dashboard or detail page renders for one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCard {
    pub id: String,
    pub title: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub price: PriceResult,
    pub address: String,
    pub ongoing: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub user_id: String,
    pub event_id: String,
    pub created_at: NaiveDateTime,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Int(i64),
    Float(f64),
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let id = Option::<IdRepr>::deserialize(deserializer)?;
    Ok(match id {
        Some(IdRepr::Text(text)) => text.trim().to_string(),
        Some(IdRepr::Int(n)) => n.to_string(),
        Some(IdRepr::Float(n)) => n.to_string(),
        None => String::new(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriceRepr {
    Number(f64),
    Text(String),
}

impl PriceRepr {
    fn into_price<E: serde::de::Error>(self) -> Result<f64, E> {
        let price = match self {
            PriceRepr::Number(n) => n,
            PriceRepr::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid price {text:?}")))?,
        };
        if !price.is_finite() || price < 0.0 {
            return Err(E::custom(format!("invalid price {price}")));
        }
        Ok(price)
    }
}

fn lenient_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    PriceRepr::deserialize(deserializer)?.into_price()
}

fn lenient_opt_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<PriceRepr>::deserialize(deserializer)? {
        Some(PriceRepr::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(repr) => repr.into_price().map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_camel_case_records() {
        let record: EventRecord = serde_json::from_value(json!({
            "_id": 42,
            "title": "Spring Expo",
            "startDate": "2025-03-01",
            "ticketTypes": [
                { "price": "25.5", "earlyBirdPrice": 20, "earlyBirdEnd": "2025-02-01", "isActive": true },
                { "price": 40 }
            ],
            "city": "Austin"
        }))
        .unwrap();

        assert_eq!(record.id, "42");
        assert_eq!(record.end_date, None);
        assert_eq!(record.ticket_types[0].price, 25.5);
        assert_eq!(record.ticket_types[0].early_bird_price, Some(20.0));
        assert!(record.ticket_types[0].is_active);
        assert!(!record.ticket_types[1].is_active);
        assert_eq!(record.city.as_deref(), Some("Austin"));
    }

    #[test]
    fn missing_id_becomes_blank() {
        let record: EventRecord = serde_json::from_value(json!({ "title": "x" })).unwrap();
        assert!(record.id.is_empty());
        let record: EventRecord = serde_json::from_value(json!({ "id": null })).unwrap();
        assert!(record.id.is_empty());
    }

    #[test]
    fn nulls_fall_back_to_defaults() {
        let record: EventRecord = serde_json::from_value(json!({
            "id": "n",
            "title": null,
            "ticketTypes": null
        }))
        .unwrap();
        assert!(record.title.is_empty());
        assert!(record.ticket_types.is_empty());

        let ticket: TicketType =
            serde_json::from_value(json!({ "price": 5, "isActive": null })).unwrap();
        assert!(!ticket.is_active);
    }

    #[test]
    fn blank_early_bird_price_is_absent() {
        let ticket: TicketType =
            serde_json::from_value(json!({ "price": 10, "earlyBirdPrice": "" })).unwrap();
        assert_eq!(ticket.early_bird_price, None);
    }

    #[test]
    fn non_numeric_price_is_rejected() {
        let ticket = serde_json::from_value::<TicketType>(json!({ "price": "ten" }));
        assert!(ticket.is_err());
    }

    #[test]
    fn non_finite_and_negative_prices_are_rejected() {
        for price in [json!("NaN"), json!("inf"), json!("-infinity"), json!("-5"), json!(-5)] {
            let ticket = serde_json::from_value::<TicketType>(json!({ "price": price.clone() }));
            assert!(ticket.is_err(), "price {price} was accepted");

            let ticket = serde_json::from_value::<TicketType>(
                json!({ "price": 10, "earlyBirdPrice": price.clone() }),
            );
            assert!(ticket.is_err(), "early bird price {price} was accepted");
        }

        let ticket: TicketType = serde_json::from_value(json!({ "price": "0" })).unwrap();
        assert_eq!(ticket.price, 0.0);
    }

    #[test]
    fn writes_camel_case_and_skips_absent_fields() {
        let record = EventRecord {
            id: "a".into(),
            title: "Gala".into(),
            start_date: Some("2025-05-05".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["startDate"], "2025-05-05");
        assert!(value.get("endDate").is_none());
        assert_eq!(value["ticketTypes"], json!([]));
    }
}
