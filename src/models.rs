use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PokemonRecord {
    pub id: i64,
    pub name: String,
    pub box_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Query string of `POST /api/save`. Kept as raw text so a malformed id
/// is reported as invalid input instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveQuery {
    pub box_id: Option<String>,
}

impl SaveQuery {
    pub fn parse_box_id(&self) -> AppResult<i64> {
        let raw = self
            .box_id
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| AppError::InvalidInput("boxId query parameter is required".to_string()))?;
        raw.parse::<i64>()
            .map_err(|_| AppError::InvalidInput(format!("boxId must be an integer, got {raw:?}")))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePokemonPayload {
    pub name: String,
}

impl SavePokemonPayload {
    /// Decodes a request body. `name` must be present and a string; its
    /// value is kept exactly as sent.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(body)
            .map_err(|error| AppError::InvalidInput(format!("malformed body: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::{PokemonRecord, SavePokemonPayload, SaveQuery};
    use crate::errors::AppError;
    use chrono::Utc;

    fn query(raw: Option<&str>) -> SaveQuery {
        SaveQuery {
            box_id: raw.map(ToString::to_string),
        }
    }

    #[test]
    fn box_id_parses_integers_and_rejects_everything_else() {
        assert_eq!(query(Some("5")).parse_box_id().expect("parse"), 5);
        assert_eq!(query(Some(" -12 ")).parse_box_id().expect("parse"), -12);
        assert!(matches!(query(Some("five")).parse_box_id(), Err(AppError::InvalidInput(_))));
        assert!(matches!(query(Some("1.5")).parse_box_id(), Err(AppError::InvalidInput(_))));
        assert!(matches!(query(Some("")).parse_box_id(), Err(AppError::InvalidInput(_))));
        assert!(matches!(query(None).parse_box_id(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn payload_requires_a_string_name() {
        let payload = SavePokemonPayload::from_body(br#"{"name":"  Pikachu "}"#).expect("payload");
        assert_eq!(payload.name, "  Pikachu ");

        let empty = SavePokemonPayload::from_body(br#"{"name":""}"#).expect("payload");
        assert_eq!(empty.name, "");

        let rejected: [&[u8]; 5] = [
            br#"{}"#,
            br#"{"name":42}"#,
            br#"{"name":null}"#,
            b"not json",
            b"",
        ];
        for body in rejected {
            assert!(matches!(
                SavePokemonPayload::from_body(body),
                Err(AppError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn pokemon_serializes_with_camel_case_fields() {
        let record = PokemonRecord {
            id: 1,
            name: "Pikachu".to_string(),
            box_id: 5,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["boxId"], 5);
        assert_eq!(value["name"], "Pikachu");
        assert!(value.get("createdAt").is_some());
    }
}
