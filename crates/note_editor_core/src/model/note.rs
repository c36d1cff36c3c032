//! Note domain model.
//!
//! # Responsibility
//! - Define the note record shown and edited by editor surfaces.
//! - Address every note field by name, so diffs, partial saves and
//!   enrichment patches are expressed as field lists.
//!
//! # Invariants
//! - `id` is `None` until storage assigns it and never changes afterwards.
//! - `item_type` is always `ItemType::Note`; it is read-only through
//!   `Note::set`.
//! - Notes are plain values. Callers produce a new value per mutation and
//!   replace shared slots wholesale.
//!
//! # See also
//! - crate::editor::diff

use crate::model::folder::FolderId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable note identifier assigned by storage on first save.
pub type NoteId = Uuid;

static LINKED_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":/([0-9a-fA-F]{32})").expect("valid linked item regex"));

/// Item kind discriminator shared by every persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Note,
    Folder,
    Resource,
}

impl ItemType {
    /// Numeric code used in storage and in field values.
    pub fn code(self) -> i64 {
        match self {
            Self::Note => 1,
            Self::Folder => 2,
            Self::Resource => 4,
        }
    }
}

/// Named note field.
///
/// Declaration order is the order used by diffs and SQL column lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteField {
    Id,
    ParentId,
    Title,
    Body,
    CreatedTime,
    UpdatedTime,
    UserCreatedTime,
    UserUpdatedTime,
    Latitude,
    Longitude,
    Altitude,
    IsTodo,
    TodoDue,
    TodoCompleted,
    SourceUrl,
    Author,
    /// Type discriminator. Never part of a diff.
    ItemType,
}

impl NoteField {
    pub const ALL: [NoteField; 17] = [
        Self::Id,
        Self::ParentId,
        Self::Title,
        Self::Body,
        Self::CreatedTime,
        Self::UpdatedTime,
        Self::UserCreatedTime,
        Self::UserUpdatedTime,
        Self::Latitude,
        Self::Longitude,
        Self::Altitude,
        Self::IsTodo,
        Self::TodoDue,
        Self::TodoCompleted,
        Self::SourceUrl,
        Self::Author,
        Self::ItemType,
    ];

    /// Stable snake_case name, also used as the SQL column name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::ParentId => "parent_id",
            Self::Title => "title",
            Self::Body => "body",
            Self::CreatedTime => "created_time",
            Self::UpdatedTime => "updated_time",
            Self::UserCreatedTime => "user_created_time",
            Self::UserUpdatedTime => "user_updated_time",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::Altitude => "altitude",
            Self::IsTodo => "is_todo",
            Self::TodoDue => "todo_due",
            Self::TodoCompleted => "todo_completed",
            Self::SourceUrl => "source_url",
            Self::Author => "author",
            Self::ItemType => "type_",
        }
    }

    /// Parses a field from its stable name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name() == name.trim())
    }

    /// Whether callers may assign this field through `Note::set`.
    pub fn is_writable(self) -> bool {
        !matches!(self, Self::Id | Self::ItemType)
    }
}

impl Display for NoteField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Dynamically typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

/// Error raised when a field assignment is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteFieldError {
    /// Field is managed by storage and cannot be assigned.
    ReadOnly(NoteField),
    /// Value kind does not match the field type.
    TypeMismatch {
        field: NoteField,
        expected: &'static str,
        found: &'static str,
    },
    /// Value kind matches but content is not acceptable.
    InvalidValue { field: NoteField, message: String },
}

impl Display for NoteFieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadOnly(field) => write!(f, "note field `{field}` is read-only"),
            Self::TypeMismatch {
                field,
                expected,
                found,
            } => write!(f, "note field `{field}` expects {expected}, got {found}"),
            Self::InvalidValue { field, message } => {
                write!(f, "invalid value for note field `{field}`: {message}")
            }
        }
    }
}

impl Error for NoteFieldError {}

/// Validation failures for note records.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteValidationError {
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
    /// `todo_completed` is set on a note that is not a todo.
    TodoCompletedWithoutTodo,
    /// Note has no parent folder.
    MissingParentFolder,
    /// Parent folder id does not resolve to a stored folder.
    ParentFolderNotFound(FolderId),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LatitudeOutOfRange(value) => {
                write!(f, "latitude must be within [-90, 90], got {value}")
            }
            Self::LongitudeOutOfRange(value) => {
                write!(f, "longitude must be within [-180, 180], got {value}")
            }
            Self::TodoCompletedWithoutTodo => {
                write!(f, "todo_completed requires is_todo to be set")
            }
            Self::MissingParentFolder => write!(f, "note must belong to a folder"),
            Self::ParentFolderNotFound(id) => write!(f, "parent folder not found: {id}"),
        }
    }
}

impl Error for NoteValidationError {}

/// Note record edited by editor surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Option<NoteId>,
    pub parent_id: Option<FolderId>,
    pub title: String,
    /// Markdown body.
    pub body: String,
    /// Unix epoch milliseconds, storage-assigned.
    pub created_time: Option<i64>,
    /// Unix epoch milliseconds, bumped by storage on every write.
    pub updated_time: Option<i64>,
    pub user_created_time: Option<i64>,
    pub user_updated_time: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub is_todo: bool,
    pub todo_due: Option<i64>,
    pub todo_completed: Option<i64>,
    pub source_url: String,
    pub author: String,
    /// Serialized as `type_` to match external schema naming.
    #[serde(rename = "type_")]
    pub item_type: ItemType,
}

impl Default for Note {
    fn default() -> Self {
        Self {
            id: None,
            parent_id: None,
            title: String::new(),
            body: String::new(),
            created_time: None,
            updated_time: None,
            user_created_time: None,
            user_updated_time: None,
            latitude: None,
            longitude: None,
            altitude: None,
            is_todo: false,
            todo_due: None,
            todo_completed: None,
            source_url: String::new(),
            author: String::new(),
            item_type: ItemType::Note,
        }
    }
}

impl Note {
    /// Creates an unsaved note in the given folder.
    pub fn new_in(parent_id: Option<FolderId>) -> Self {
        Self {
            parent_id,
            ..Self::default()
        }
    }

    /// Whether storage has assigned an id yet.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Reads one field as a dynamically typed value.
    pub fn get(&self, field: NoteField) -> FieldValue {
        match field {
            NoteField::Id => opt_id_value(self.id),
            NoteField::ParentId => opt_id_value(self.parent_id),
            NoteField::Title => FieldValue::Text(self.title.clone()),
            NoteField::Body => FieldValue::Text(self.body.clone()),
            NoteField::CreatedTime => opt_int_value(self.created_time),
            NoteField::UpdatedTime => opt_int_value(self.updated_time),
            NoteField::UserCreatedTime => opt_int_value(self.user_created_time),
            NoteField::UserUpdatedTime => opt_int_value(self.user_updated_time),
            NoteField::Latitude => opt_real_value(self.latitude),
            NoteField::Longitude => opt_real_value(self.longitude),
            NoteField::Altitude => opt_real_value(self.altitude),
            NoteField::IsTodo => FieldValue::Bool(self.is_todo),
            NoteField::TodoDue => opt_int_value(self.todo_due),
            NoteField::TodoCompleted => opt_int_value(self.todo_completed),
            NoteField::SourceUrl => FieldValue::Text(self.source_url.clone()),
            NoteField::Author => FieldValue::Text(self.author.clone()),
            NoteField::ItemType => FieldValue::Integer(self.item_type.code()),
        }
    }

    /// Assigns one field from a dynamically typed value.
    ///
    /// # Errors
    /// - `ReadOnly` for `id` and `type_`.
    /// - `TypeMismatch` when the value kind does not fit the field.
    pub fn set(&mut self, field: NoteField, value: FieldValue) -> Result<(), NoteFieldError> {
        match field {
            NoteField::Id | NoteField::ItemType => return Err(NoteFieldError::ReadOnly(field)),
            NoteField::ParentId => self.parent_id = expect_opt_id(field, value)?,
            NoteField::Title => self.title = expect_text(field, value)?,
            NoteField::Body => self.body = expect_text(field, value)?,
            NoteField::CreatedTime => self.created_time = expect_opt_int(field, value)?,
            NoteField::UpdatedTime => self.updated_time = expect_opt_int(field, value)?,
            NoteField::UserCreatedTime => self.user_created_time = expect_opt_int(field, value)?,
            NoteField::UserUpdatedTime => self.user_updated_time = expect_opt_int(field, value)?,
            NoteField::Latitude => self.latitude = expect_opt_real(field, value)?,
            NoteField::Longitude => self.longitude = expect_opt_real(field, value)?,
            NoteField::Altitude => self.altitude = expect_opt_real(field, value)?,
            NoteField::IsTodo => self.is_todo = expect_bool(field, value)?,
            NoteField::TodoDue => self.todo_due = expect_opt_int(field, value)?,
            NoteField::TodoCompleted => self.todo_completed = expect_opt_int(field, value)?,
            NoteField::SourceUrl => self.source_url = expect_text(field, value)?,
            NoteField::Author => self.author = expect_text(field, value)?,
        }
        Ok(())
    }

    /// Returns a copy of this note with one field replaced.
    pub fn with_field(&self, field: NoteField, value: FieldValue) -> Result<Self, NoteFieldError> {
        let mut next = self.clone();
        next.set(field, value)?;
        Ok(next)
    }

    /// Validates structural invariants that do not need storage access.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        self.validate_fields(&NoteField::ALL)
    }

    /// Like `validate`, but only checks rules that involve one of `fields`.
    pub fn validate_fields(&self, fields: &[NoteField]) -> Result<(), NoteValidationError> {
        let touches = |rule: &[NoteField]| rule.iter().any(|field| fields.contains(field));
        if let Some(latitude) = self.latitude.filter(|_| touches(&[NoteField::Latitude])) {
            if !(-90.0..=90.0).contains(&latitude) {
                return Err(NoteValidationError::LatitudeOutOfRange(latitude));
            }
        }
        if let Some(longitude) = self.longitude.filter(|_| touches(&[NoteField::Longitude])) {
            if !(-180.0..=180.0).contains(&longitude) {
                return Err(NoteValidationError::LongitudeOutOfRange(longitude));
            }
        }
        if touches(&[NoteField::IsTodo, NoteField::TodoCompleted])
            && !self.is_todo
            && self.todo_completed.is_some()
        {
            return Err(NoteValidationError::TodoCompletedWithoutTodo);
        }
        Ok(())
    }
}

/// Partial note keyed by field, used for late-arriving derived data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotePatch {
    fields: BTreeMap<NoteField, FieldValue>,
}

impl NotePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: NoteField, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn insert(&mut self, field: NoteField, value: impl Into<FieldValue>) {
        self.fields.insert(field, value.into());
    }

    pub fn get(&self, field: NoteField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Field names carried by this patch, in declaration order.
    pub fn field_names(&self) -> Vec<NoteField> {
        self.fields.keys().copied().collect()
    }

    /// Returns a copy of `note` with every patched field applied.
    pub fn apply_to(&self, note: &Note) -> Result<Note, NoteFieldError> {
        let mut next = note.clone();
        for (field, value) in &self.fields {
            next.set(*field, value.clone())?;
        }
        Ok(next)
    }
}

/// Extracts item ids referenced as `:/<32 hex>` links, in first-seen order.
pub fn linked_ids_in_body(body: &str) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for caps in LINKED_ITEM_RE.captures_iter(body) {
        let Some(raw) = caps.get(1) else { continue };
        if let Ok(id) = Uuid::parse_str(raw.as_str()) {
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }
    ids
}

fn opt_id_value(value: Option<Uuid>) -> FieldValue {
    value.map_or(FieldValue::Null, |id| {
        FieldValue::Text(id.simple().to_string())
    })
}

fn opt_int_value(value: Option<i64>) -> FieldValue {
    value.map_or(FieldValue::Null, FieldValue::Integer)
}

fn opt_real_value(value: Option<f64>) -> FieldValue {
    value.map_or(FieldValue::Null, FieldValue::Real)
}

fn mismatch(field: NoteField, expected: &'static str, value: &FieldValue) -> NoteFieldError {
    NoteFieldError::TypeMismatch {
        field,
        expected,
        found: value.kind(),
    }
}

fn expect_text(field: NoteField, value: FieldValue) -> Result<String, NoteFieldError> {
    match value {
        FieldValue::Text(text) => Ok(text),
        FieldValue::Null => Ok(String::new()),
        other => Err(mismatch(field, "text", &other)),
    }
}

fn expect_opt_int(field: NoteField, value: FieldValue) -> Result<Option<i64>, NoteFieldError> {
    match value {
        FieldValue::Integer(number) => Ok(Some(number)),
        FieldValue::Null => Ok(None),
        other => Err(mismatch(field, "integer", &other)),
    }
}

fn expect_opt_real(field: NoteField, value: FieldValue) -> Result<Option<f64>, NoteFieldError> {
    match value {
        FieldValue::Real(number) => Ok(Some(number)),
        FieldValue::Integer(number) => Ok(Some(number as f64)),
        FieldValue::Null => Ok(None),
        other => Err(mismatch(field, "real", &other)),
    }
}

fn expect_bool(field: NoteField, value: FieldValue) -> Result<bool, NoteFieldError> {
    match value {
        FieldValue::Bool(flag) => Ok(flag),
        FieldValue::Integer(0) => Ok(false),
        FieldValue::Integer(1) => Ok(true),
        other => Err(mismatch(field, "bool", &other)),
    }
}

fn expect_opt_id(field: NoteField, value: FieldValue) -> Result<Option<Uuid>, NoteFieldError> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Text(text) if text.trim().is_empty() => Ok(None),
        FieldValue::Text(text) => Uuid::parse_str(text.trim())
            .map(Some)
            .map_err(|_| NoteFieldError::InvalidValue {
                field,
                message: format!("`{text}` is not a valid id"),
            }),
        other => Err(mismatch(field, "id text", &other)),
    }
}
