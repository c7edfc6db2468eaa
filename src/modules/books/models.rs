use bookshelf_db::Document;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use time::OffsetDateTime;

/// Store collection holding book documents.
pub const COLLECTION: &str = "books";

/// Earliest accepted publication year.
pub const MIN_YEAR: i64 = 1900;
/// Latest accepted publication year.
pub const MAX_YEAR: i64 = 2025;

/// A catalog entry as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Store-assigned identifier, distinct from the ISBN
    #[serde(rename = "_id")]
    pub id: String,
    /// Business key; at most one book per ISBN
    pub isbn: String,
    pub title: String,
    pub author: String,
    /// Publication year within [`MIN_YEAR`, `MAX_YEAR`]
    pub year: i32,
    pub category: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Book {
    /// Decode a document read back from the store.
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(document))
    }
}

/// Request body for creating a book. Every field is optional here so that
/// missing fields surface as a validation error rather than a parse error.
///
/// Text fields also accept JSON numbers, and `year` accepts a numeric string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBook {
    #[serde(default, deserialize_with = "text_field")]
    pub isbn: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "year_field")]
    pub year: Option<i64>,
    #[serde(default, deserialize_with = "text_field")]
    pub category: Option<String>,
}

/// Scalar accepted where a string or a number is expected.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

fn text_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::Text(text) => text,
        Scalar::Number(number) => number.to_string(),
    }))
}

fn year_field<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("year {number} is not a whole number"))),
        Some(Scalar::Text(text)) => {
            let trimmed = text.trim();
            // An empty string counts as missing.
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<i64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("year \"{text}\" is not a number")))
        }
    }
}

/// A validated book that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub category: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl NewBook {
    /// Encode the book as a store document.
    pub fn into_document(self) -> Result<Document, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(document) => Ok(document),
            other => Err(serde::ser::Error::custom(format!(
                "book serialized to {other} instead of an object"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookValidationError {
    #[error("All fields are required")]
    MissingFields(Vec<&'static str>),

    #[error("Year must be between 1900 and 2025")]
    YearOutOfRange(i64),
}

impl BookValidationError {
    /// Field-level details for the error response.
    pub fn details(&self) -> Vec<Value> {
        match self {
            BookValidationError::MissingFields(fields) => fields
                .iter()
                .map(|field| json!({ "field": field, "error": "required" }))
                .collect(),
            BookValidationError::YearOutOfRange(year) => vec![json!({
                "field": "year",
                "error": "out_of_range",
                "value": year,
                "min": MIN_YEAR,
                "max": MAX_YEAR,
            })],
        }
    }
}

// Empty strings count as missing.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl TryFrom<CreateBook> for NewBook {
    type Error = BookValidationError;

    fn try_from(payload: CreateBook) -> Result<Self, Self::Error> {
        let isbn = present(payload.isbn);
        let title = present(payload.title);
        let author = present(payload.author);
        // A year of zero counts as missing.
        let year = payload.year.filter(|y| *y != 0);
        let category = present(payload.category);

        let (Some(isbn), Some(title), Some(author), Some(year), Some(category)) =
            (&isbn, &title, &author, year, &category)
        else {
            let missing = [
                ("isbn", isbn.is_none()),
                ("title", title.is_none()),
                ("author", author.is_none()),
                ("year", year.is_none()),
                ("category", category.is_none()),
            ]
            .into_iter()
            .filter_map(|(field, absent)| absent.then_some(field))
            .collect();
            return Err(BookValidationError::MissingFields(missing));
        };

        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(BookValidationError::YearOutOfRange(year));
        }
        let year = i32::try_from(year).map_err(|_| BookValidationError::YearOutOfRange(year))?;

        let now = OffsetDateTime::now_utc();
        Ok(NewBook {
            isbn: isbn.clone(),
            title: title.clone(),
            author: author.clone(),
            year,
            category: category.clone(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Aggregate view over every stored book, in store order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    pub year: Vec<i32>,
    pub category: Vec<String>,
    pub total_books: usize,
}

impl BookStats {
    pub fn from_books(books: &[Book]) -> Self {
        Self {
            year: books.iter().map(|b| b.year).collect(),
            category: books.iter().map(|b| b.category.clone()).collect(),
            total_books: books.len(),
        }
    }
}
