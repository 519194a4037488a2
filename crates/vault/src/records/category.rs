//! Data categories and the columns of each that hold sensitive values.

use serde::{Deserialize, Serialize};

/// Shape of a sensitive column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// A single string value with a single IV.
    Scalar,
    /// A list of strings, each with its own IV in a parallel list.
    Array,
    /// A free-text scalar that opens to `""` when the stored value is null.
    OptionalText,
}

/// A column whose value is encrypted, together with its IV sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensitiveColumn {
    pub name: &'static str,
    pub iv_column: &'static str,
    pub kind: ColumnKind,
}

const fn scalar(name: &'static str, iv_column: &'static str) -> SensitiveColumn {
    SensitiveColumn {
        name,
        iv_column,
        kind: ColumnKind::Scalar,
    }
}

const fn optional_text(name: &'static str, iv_column: &'static str) -> SensitiveColumn {
    SensitiveColumn {
        name,
        iv_column,
        kind: ColumnKind::OptionalText,
    }
}

const fn array(name: &'static str, iv_column: &'static str) -> SensitiveColumn {
    SensitiveColumn {
        name,
        iv_column,
        kind: ColumnKind::Array,
    }
}

// The insulin table stores the type's IV in a lowercase column.
const INSULIN: &[SensitiveColumn] = &[
    scalar("insulinType", "insulintype_iv"),
    scalar("dose", "dose_iv"),
];

const FOOD: &[SensitiveColumn] = &[
    scalar("food_type", "food_type_iv"),
    scalar("quantity", "quantity_iv"),
    scalar("carbs", "carbs_iv"),
];

// Exercise intensity is a plain enum value and is not encrypted.
const EXERCISE: &[SensitiveColumn] = &[
    scalar("exercise_type", "exercise_type_iv"),
    scalar("exercise_description", "exercise_description_iv"),
];

const PERIOD: &[SensitiveColumn] = &[
    scalar("intensity", "intensity_iv"),
    array("symptoms", "symptoms_iv"),
    scalar("notes", "notes_iv"),
];

const MOOD: &[SensitiveColumn] = &[
    scalar("routine_description", "routine_description_iv"),
    array("emotions", "emotions_iv"),
    optional_text("other_emotion", "other_emotion_iv"),
];

/// Column names that hold dates or times. These are never encrypted.
pub const DATE_FIELDS: &[&str] = &[
    "date_time",
    "dateTime",
    "startDate",
    "endDate",
    "actualDateTime",
    "exercise_start_time",
    "exercise_end_time",
    "exerciseStartTime",
    "exerciseEndTime",
];

/// Returns `true` if `column` holds a date or time value.
pub fn is_date_field(column: &str) -> bool {
    DATE_FIELDS.contains(&column)
}

/// A kind of tracked health record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Insulin,
    Food,
    Exercise,
    Period,
    Mood,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Insulin,
        Category::Food,
        Category::Exercise,
        Category::Period,
        Category::Mood,
    ];

    /// Table the category's rows are persisted in.
    pub fn table(self) -> &'static str {
        match self {
            Category::Insulin => "insulindata",
            Category::Food => "fooddata",
            Category::Exercise => "exercisedata",
            Category::Period => "periodrecords",
            Category::Mood => "mooddata",
        }
    }

    /// Columns that are encrypted at write time and decrypted at read time.
    pub fn sensitive_columns(self) -> &'static [SensitiveColumn] {
        match self {
            Category::Insulin => INSULIN,
            Category::Food => FOOD,
            Category::Exercise => EXERCISE,
            Category::Period => PERIOD,
            Category::Mood => MOOD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_sensitive_column_is_a_date() {
        for category in Category::ALL {
            for col in category.sensitive_columns() {
                assert!(!is_date_field(col.name), "{} is a date column", col.name);
            }
        }
    }

    #[test]
    fn date_fields_recognised() {
        assert!(is_date_field("date_time"));
        assert!(is_date_field("exerciseEndTime"));
        assert!(!is_date_field("dose"));
        assert!(!is_date_field("Date_Time"));
    }

    #[test]
    fn array_columns() {
        let arrays: Vec<_> = Category::ALL
            .iter()
            .flat_map(|c| c.sensitive_columns())
            .filter(|c| c.kind == ColumnKind::Array)
            .map(|c| c.name)
            .collect();
        assert_eq!(arrays, vec!["symptoms", "emotions"]);
    }

    #[test]
    fn only_other_emotion_is_optional_text() {
        let optional: Vec<_> = Category::ALL
            .iter()
            .flat_map(|c| c.sensitive_columns())
            .filter(|c| c.kind == ColumnKind::OptionalText)
            .map(|c| c.name)
            .collect();
        assert_eq!(optional, vec!["other_emotion"]);
    }

    #[test]
    fn category_deserialises_lowercase() {
        let c: Category = serde_json::from_str("\"period\"").unwrap();
        assert_eq!(c, Category::Period);
        assert_eq!(c.table(), "periodrecords");
        assert!(serde_json::from_str::<Category>("\"glucose\"").is_err());
    }
}
