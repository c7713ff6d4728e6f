use std::{fmt, str::FromStr};

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Who currently handles a contact's conversation.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum BotMode {
    /// The automated agent answers.
    Bot,
    /// A human operator answers.
    #[default]
    Human,
}

impl BotMode {
    /// Value written to the sheet and the webhook.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::Human => "OFF",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Bot => Self::Human,
            Self::Human => Self::Bot,
        }
    }
}

impl fmt::Display for BotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BotMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "bot" => Ok(Self::Bot),
            "" | "off" | "humano" | "human" | "manual" => Ok(Self::Human),
            _ => Err(ValidationError::InvalidMode(value.to_owned())),
        }
    }
}

impl Serialize for BotMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Canonical contact record, independent of the sheet's column spelling.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contact {
    pub key: String,
    pub name: String,
    pub phone: String,
    pub bot_mode: BotMode,
    pub last_interaction: Option<String>,
}

/// Why a record or an argument was rejected.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is supplied by several columns: {}", .keys.join(", "))]
    DuplicateField {
        field: &'static str,
        keys: Vec<String>,
    },
    #[error("field `{field}` must be text or a number")]
    InvalidType { field: &'static str },
    #[error("invalid phone number '{0}'")]
    InvalidPhone(String),
    #[error("invalid bot mode '{0}'")]
    InvalidMode(String),
}

/// A record dropped during [`normalize_records`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RejectedRecord {
    /// Position in the source array.
    pub index: usize,
    pub error: ValidationError,
}

/// Result of loading the sheet: usable contacts plus the rows that were not.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ContactList {
    pub contacts: Vec<Contact>,
    pub rejected: Vec<RejectedRecord>,
}

const MIN_PHONE_LEN: usize = 10;
const MAX_PHONE_LEN: usize = 15;

const KEY_ALIASES: &[&str] = &["key", "id"];
const NAME_ALIASES: &[&str] = &["nome", "name"];
const PHONE_ALIASES: &[&str] = &["numero", "phone", "telefone"];
const MODE_ALIASES: &[&str] = &["modo", "mode"];
const LAST_INTERACTION_ALIASES: &[&str] = &["timestamp_ultima", "last_interaction"];

/// Checks a phone number: 10 to 15 characters once whitespace is removed,
/// made only of digits, spaces, `-`, `+`, `(` and `)`.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    let len = compact.chars().count();
    let allowed = compact
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '(' | ')'));

    if allowed && (MIN_PHONE_LEN..=MAX_PHONE_LEN).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone(phone.to_owned()))
    }
}

/// Maps one raw sheet row onto a [`Contact`].
pub fn normalize_record(record: &JsonValue) -> Result<Contact, ValidationError> {
    let object = record.as_object().ok_or(ValidationError::NotAnObject)?;

    let name = lookup(object, "name", NAME_ALIASES)?.ok_or(ValidationError::MissingField("name"))?;
    let phone =
        lookup(object, "phone", PHONE_ALIASES)?.ok_or(ValidationError::MissingField("phone"))?;
    validate_phone(&phone)?;

    let bot_mode = match lookup(object, "bot_mode", MODE_ALIASES)? {
        Some(mode) => mode.parse()?,
        None => BotMode::Human,
    };
    let last_interaction = lookup(object, "last_interaction", LAST_INTERACTION_ALIASES)?;
    let key = lookup(object, "key", KEY_ALIASES)?.unwrap_or_else(|| phone.clone());

    Ok(Contact {
        key,
        name,
        phone,
        bot_mode,
        last_interaction,
    })
}

/// Normalizes every row, keeping valid contacts and reporting the others.
pub fn normalize_records(records: &[JsonValue]) -> ContactList {
    let mut list = ContactList::default();
    for (index, record) in records.iter().enumerate() {
        match normalize_record(record) {
            Ok(contact) => list.contacts.push(contact),
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(index, %error, "rejecting contact record");
                list.rejected.push(RejectedRecord { index, error });
            }
        }
    }
    list
}

/// Finds the single non-empty value among the columns matching `aliases`.
fn lookup(
    object: &Map<String, JsonValue>,
    field: &'static str,
    aliases: &[&str],
) -> Result<Option<String>, ValidationError> {
    let mut found: Vec<(&str, String)> = Vec::new();

    for (key, value) in object {
        let column = key.trim();
        if !aliases.iter().any(|alias| column.eq_ignore_ascii_case(alias)) {
            continue;
        }
        let text = match value {
            JsonValue::Null => continue,
            JsonValue::String(text) => text.trim().to_owned(),
            JsonValue::Number(number) => number.to_string(),
            _ => return Err(ValidationError::InvalidType { field }),
        };
        if !text.is_empty() {
            found.push((key.as_str(), text));
        }
    }

    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop().map(|(_, text)| text)),
        _ => Err(ValidationError::DuplicateField {
            field,
            keys: found.into_iter().map(|(key, _)| key.to_owned()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{normalize_record, normalize_records, validate_phone, BotMode, ValidationError};

    #[test]
    fn accepts_mixed_column_casings() {
        let contact = normalize_record(&json!({
            "Nome": "  Ana Souza ",
            "NUMERO": "+55 11 99999-0000",
            "Modo": "BOT",
            "timestamp_ultima": "2024-05-01 10:00"
        }))
        .expect("record must normalize");

        assert_eq!(contact.name, "Ana Souza");
        assert_eq!(contact.phone, "+55 11 99999-0000");
        assert_eq!(contact.key, "+55 11 99999-0000");
        assert_eq!(contact.bot_mode, BotMode::Bot);
        assert_eq!(contact.last_interaction.as_deref(), Some("2024-05-01 10:00"));
    }

    #[test]
    fn explicit_key_and_numeric_phone_are_kept() {
        let contact = normalize_record(&json!({
            "Key": "row-7",
            "name": "Bruno",
            "phone": 5511988887777u64
        }))
        .expect("record must normalize");

        assert_eq!(contact.key, "row-7");
        assert_eq!(contact.phone, "5511988887777");
        assert_eq!(contact.bot_mode, BotMode::Human);
        assert_eq!(contact.last_interaction, None);
    }

    #[test]
    fn two_columns_for_one_field_is_an_error() {
        let err = normalize_record(&json!({
            "nome": "Ana",
            "Nome": "Ana Paula",
            "numero": "5511999990000"
        }))
        .expect_err("duplicate name columns must be rejected");

        match err {
            ValidationError::DuplicateField { field, mut keys } => {
                keys.sort();
                assert_eq!(field, "name");
                assert_eq!(keys, vec!["Nome".to_owned(), "nome".to_owned()]);
            }
            other => panic!("expected duplicate field, got {other:?}"),
        }
    }

    #[test]
    fn blank_duplicate_column_is_ignored() {
        let contact = normalize_record(&json!({
            "nome": "",
            "Nome": "Ana",
            "numero": "5511999990000"
        }))
        .expect("blank column must not count");
        assert_eq!(contact.name, "Ana");
    }

    #[test]
    fn missing_name_or_phone_is_reported() {
        assert_eq!(
            normalize_record(&json!({"numero": "5511999990000"})),
            Err(ValidationError::MissingField("name"))
        );
        assert_eq!(
            normalize_record(&json!({"nome": "Ana", "numero": null})),
            Err(ValidationError::MissingField("phone"))
        );
    }

    #[test]
    fn non_text_values_and_non_objects_are_rejected() {
        assert_eq!(
            normalize_record(&json!({"nome": ["Ana"], "numero": "5511999990000"})),
            Err(ValidationError::InvalidType { field: "name" })
        );
        assert_eq!(
            normalize_record(&json!("Ana")),
            Err(ValidationError::NotAnObject)
        );
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert_eq!(
            normalize_record(&json!({"nome": "Ana", "numero": "5511999990000", "modo": "maybe"})),
            Err(ValidationError::InvalidMode("maybe".to_owned()))
        );
    }

    #[test]
    fn phone_rules() {
        assert!(validate_phone("5511999990000").is_ok());
        assert!(validate_phone("(11) 9999-0000").is_ok());
        assert!(validate_phone("(11) 99999-0000").is_ok());
        assert!(validate_phone("123456789").is_err());
        assert!(validate_phone("1234567890123456").is_err());
        assert!(validate_phone("5511abc90000").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn bot_mode_parsing_and_wire_values() {
        assert_eq!("bot".parse::<BotMode>(), Ok(BotMode::Bot));
        assert_eq!("OFF".parse::<BotMode>(), Ok(BotMode::Human));
        assert_eq!("humano".parse::<BotMode>(), Ok(BotMode::Human));
        assert_eq!(BotMode::Bot.as_str(), "bot");
        assert_eq!(BotMode::Human.as_str(), "OFF");
        assert_eq!(BotMode::Human.toggled(), BotMode::Bot);
        assert_eq!(
            serde_json::to_value(BotMode::Bot).expect("serialize"),
            json!("bot")
        );
    }

    #[test]
    fn normalize_records_keeps_valid_rows_and_indexes_rejects() {
        let list = normalize_records(&[
            json!({"nome": "Ana", "numero": "5511999990000"}),
            json!({"nome": "Sem telefone"}),
            json!({"nome": "Caio", "numero": "5511977776666", "modo": "bot"}),
        ]);

        assert_eq!(list.contacts.len(), 2);
        assert_eq!(list.contacts[1].name, "Caio");
        assert_eq!(list.rejected.len(), 1);
        assert_eq!(list.rejected[0].index, 1);
        assert_eq!(
            list.rejected[0].error,
            ValidationError::MissingField("phone")
        );
    }
}
