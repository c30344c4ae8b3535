/*!
 * The validation module turns loosely-typed request payloads into the typed
 * inputs of the catalog and vote operations.
 *
 * Every validator returns either the typed value or the full set of field
 * errors found, so a client sees everything wrong with a request at once.
 */
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::models::{ChoiceChanges, NewChoice, NewQuestion, QuestionChanges};

pub const MAX_TEXT_LENGTH: usize = 200;

const NON_FIELD_ERRORS: &str = "non_field_errors";

/**
 * Field name to the list of messages describing what is wrong with it
 */
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|m| m.as_slice())
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/**
 * Validate a vote payload: `{ "choice": <choice id> }`
 */
pub fn vote_choice(payload: &Value) -> Result<i64, FieldErrors> {
    let object = as_object(payload)?;
    let mut errors = FieldErrors::new();
    let choice = pk_field(object, "choice", true, &mut errors);
    errors.into_result(choice.unwrap_or_default())
}

pub fn new_question(payload: &Value) -> Result<NewQuestion, FieldErrors> {
    let object = as_object(payload)?;
    let mut errors = FieldErrors::new();

    let question_text = text_field(object, "question_text", true, &mut errors);
    let pub_date = datetime_field(object, "pub_date", &mut errors);
    let choices = nested_choices(object, &mut errors);

    errors.into_result(NewQuestion {
        question_text: question_text.unwrap_or_default(),
        pub_date: pub_date.unwrap_or_else(Utc::now),
        choices,
    })
}

/**
 * Validate an update to a Question
 *
 * A full update (`partial == false`) requires `question_text`, a partial one
 * requires nothing. Nested choices are read-only here and ignored.
 */
pub fn question_changes(payload: &Value, partial: bool) -> Result<QuestionChanges, FieldErrors> {
    let object = as_object(payload)?;
    let mut errors = FieldErrors::new();

    let question_text = text_field(object, "question_text", !partial, &mut errors);
    let pub_date = datetime_field(object, "pub_date", &mut errors);

    errors.into_result(QuestionChanges {
        question_text,
        pub_date,
    })
}

pub fn new_choice(payload: &Value) -> Result<NewChoice, FieldErrors> {
    let object = as_object(payload)?;
    let mut errors = FieldErrors::new();

    let question_id = pk_field(object, "question", true, &mut errors);
    let choice_text = text_field(object, "choice_text", true, &mut errors);

    errors.into_result(NewChoice {
        question_id: question_id.unwrap_or_default(),
        choice_text: choice_text.unwrap_or_default(),
    })
}

pub fn choice_changes(payload: &Value, partial: bool) -> Result<ChoiceChanges, FieldErrors> {
    let object = as_object(payload)?;
    let mut errors = FieldErrors::new();
    let choice_text = text_field(object, "choice_text", !partial, &mut errors);
    errors.into_result(ChoiceChanges { choice_text })
}

/**
 * Message used when a referenced primary key has no row behind it
 */
pub fn missing_pk(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>, FieldErrors> {
    payload.as_object().ok_or_else(|| {
        FieldErrors::single(
            NON_FIELD_ERRORS,
            format!(
                "Invalid data. Expected a dictionary, but got {}.",
                type_name(payload)
            ),
        )
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn pk_field(
    object: &Map<String, Value>,
    name: &str,
    required: bool,
    errors: &mut FieldErrors,
) -> Option<i64> {
    match object.get(name) {
        None => {
            if required {
                errors.add(name, "This field is required.");
            }
            None
        }
        Some(Value::Null) => {
            errors.add(name, "This field may not be null.");
            None
        }
        Some(Value::Number(n)) if n.is_i64() => n.as_i64(),
        // Form bodies carry every value as a string
        Some(Value::String(s)) if s.trim().parse::<i64>().is_ok() => s.trim().parse().ok(),
        Some(other) => {
            errors.add(
                name,
                format!(
                    "Incorrect type. Expected pk value, received {}.",
                    type_name(other)
                ),
            );
            None
        }
    }
}

fn check_text(value: &Value) -> Result<String, &'static str> {
    match value {
        Value::Null => Err("This field may not be null."),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Err("This field may not be blank.")
            } else if s.contains('\0') {
                Err("Null characters are not allowed.")
            } else if s.chars().count() > MAX_TEXT_LENGTH {
                Err("Ensure this field has no more than 200 characters.")
            } else {
                Ok(s.to_string())
            }
        }
        _ => Err("Not a valid string."),
    }
}

fn text_field(
    object: &Map<String, Value>,
    name: &str,
    required: bool,
    errors: &mut FieldErrors,
) -> Option<String> {
    match object.get(name) {
        None => {
            if required {
                errors.add(name, "This field is required.");
            }
            None
        }
        Some(value) => match check_text(value) {
            Ok(text) => Some(text),
            Err(message) => {
                errors.add(name, message);
                None
            }
        },
    }
}

fn datetime_field(
    object: &Map<String, Value>,
    name: &str,
    errors: &mut FieldErrors,
) -> Option<DateTime<Utc>> {
    let value = object.get(name)?;
    let parsed = value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc));

    if parsed.is_none() {
        errors.add(
            name,
            "Datetime has wrong format. Use one of these formats instead: \
             YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].",
        );
    }
    parsed
}

/**
 * Choices nested in a new Question, either `{"choice_text": ..}` objects or
 * bare strings. Any `votes` given alongside is ignored.
 */
fn nested_choices(object: &Map<String, Value>, errors: &mut FieldErrors) -> Vec<String> {
    let items = match object.get("choices") {
        None | Some(Value::Null) => return vec![],
        Some(Value::Array(items)) => items,
        Some(other) => {
            errors.add(
                "choices",
                format!(
                    "Expected a list of items but got type \"{}\".",
                    type_name(other)
                ),
            );
            return vec![];
        }
    };

    let mut texts = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let text = match item {
            Value::Object(choice) => match choice.get("choice_text") {
                Some(value) => check_text(value),
                None => Err("This field is required."),
            },
            other => check_text(other),
        };
        match text {
            Ok(text) => texts.push(text),
            Err(message) => errors.add(&format!("choices[{}].choice_text", index), message),
        }
    }
    texts
}
