//! Bounded input form
//!
//! Every field is either a choice from a fixed vocabulary or a whole number
//! within fixed bounds, so a completed form always yields a row the trained
//! transform can encode.

use thiserror::Error;
use traffic_severity_core::preprocess::parse_binary;
use traffic_severity_core::schema::{
    DRIVER_AGE, DRIVER_ALCOHOL, DRIVER_EXPERIENCE, NUMBER_OF_VEHICLES, ROAD_CONDITION,
    ROAD_LIGHT_CONDITION, ROAD_TYPE, SPEED_LIMIT, TIME_OF_DAY, TRAFFIC_DENSITY, VEHICLE_TYPE,
    WEATHER,
};
use traffic_severity_core::{FeatureRow, FeatureValue};

#[derive(Debug, Error)]
pub enum FormError {
    #[error("{column}: '{value}' is not one of {options:?}")]
    NotAnOption {
        column: String,
        value: String,
        options: Vec<String>,
    },

    #[error("{column}: {value} is outside {min}..={max}")]
    OutOfRange {
        column: String,
        value: String,
        min: i64,
        max: i64,
    },

    #[error("missing field '{0}'")]
    MissingField(String),

    #[error("input cancelled")]
    Cancelled,

    #[error("prompt failed: {0}")]
    Prompt(String),
}

/// A pick-one field
#[derive(Debug, Clone, Copy)]
pub struct ChoiceField {
    pub column: &'static str,
    pub prompt: &'static str,
    pub options: &'static [&'static str],
}

/// A whole number between `min` and `max` inclusive
#[derive(Debug, Clone, Copy)]
pub struct SliderField {
    pub column: &'static str,
    pub prompt: &'static str,
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

impl ChoiceField {
    pub fn check(&self, value: &str) -> Result<(), FormError> {
        if self.options.contains(&value) {
            Ok(())
        } else {
            Err(FormError::NotAnOption {
                column: self.column.to_string(),
                value: value.to_string(),
                options: self.options.iter().map(|o| o.to_string()).collect(),
            })
        }
    }

    /// Cell value for a chosen option; yes/no columns are stored as 0/1
    pub fn value(&self, choice: &str) -> FeatureValue {
        match (self.column, parse_binary(choice)) {
            (DRIVER_ALCOHOL, Some(bit)) => FeatureValue::from(bit),
            _ => FeatureValue::from(choice),
        }
    }
}

impl SliderField {
    pub fn check(&self, value: i64) -> Result<(), FormError> {
        if (self.min..=self.max).contains(&value) {
            Ok(())
        } else {
            Err(FormError::OutOfRange {
                column: self.column.to_string(),
                value: value.to_string(),
                min: self.min,
                max: self.max,
            })
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Field {
    Choice(ChoiceField),
    Slider(SliderField),
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Field::Choice(field) => field.column,
            Field::Slider(field) => field.column,
        }
    }
}

const fn choice(
    column: &'static str,
    prompt: &'static str,
    options: &'static [&'static str],
) -> Field {
    Field::Choice(ChoiceField {
        column,
        prompt,
        options,
    })
}

const fn slider(column: &'static str, prompt: &'static str, min: i64, max: i64, default: i64) -> Field {
    Field::Slider(SliderField {
        column,
        prompt,
        min,
        max,
        default,
    })
}

/// Fields in the order they are asked
pub const FORM_FIELDS: [Field; 12] = [
    choice(WEATHER, "Weather", &["Clear", "Overcast", "Rain", "Fog", "Snow", "Thunderstorm"]),
    choice(ROAD_CONDITION, "Road Condition", &["Dry", "Wet", "Icy", "Snowy", "Muddy"]),
    choice(
        ROAD_TYPE,
        "Road Type",
        &["Highway", "Main Road", "Residential", "Rural", "Service Road"],
    ),
    choice(
        TRAFFIC_DENSITY,
        "Traffic Density",
        &["Low", "Medium", "High", "Very High", "Standstill"],
    ),
    choice(
        ROAD_LIGHT_CONDITION,
        "Road Light Condition",
        &["Daylight", "Dark - Street Lights", "Dark - No Lights"],
    ),
    choice(
        VEHICLE_TYPE,
        "Vehicle Type",
        &["Car", "Truck", "Bus", "Motorcycle", "Bicycle", "Pedestrian"],
    ),
    slider(NUMBER_OF_VEHICLES, "Number of Vehicles", 1, 1000, 2),
    slider(DRIVER_AGE, "Driver Age", 16, 80, 30),
    slider(DRIVER_EXPERIENCE, "Driver Experience (years)", 0, 60, 5),
    choice(DRIVER_ALCOHOL, "Driver under Alcohol influence?", &["No", "Yes"]),
    slider(SPEED_LIMIT, "Speed Limit (km/h)", 20, 140, 60),
    choice(TIME_OF_DAY, "Time of Day", &["Morning", "Afternoon", "Evening", "Night"]),
];

/// Where answers come from: a terminal, a script, a test
pub trait FormSource {
    fn choose(&mut self, field: &ChoiceField) -> Result<String, FormError>;
    fn slide(&mut self, field: &SliderField) -> Result<i64, FormError>;
}

/// Ask every field once and build the feature row
///
/// Answers are re-checked against the field bounds, whatever the source.
pub fn collect_answers<S: FormSource + ?Sized>(source: &mut S) -> Result<FeatureRow, FormError> {
    let mut row = FeatureRow::new();
    for field in &FORM_FIELDS {
        match field {
            Field::Choice(field) => {
                let answer = source.choose(field)?;
                field.check(&answer)?;
                row.insert(field.column, field.value(&answer));
            }
            Field::Slider(field) => {
                let answer = source.slide(field)?;
                field.check(answer)?;
                row.insert(field.column, answer);
            }
        }
    }
    Ok(row)
}

/// Check a row supplied as JSON against the same bounds as the prompts
///
/// Yes/no fields also accept 0 and 1. Columns outside the form are left alone.
pub fn validate_row(row: &FeatureRow) -> Result<(), FormError> {
    for field in &FORM_FIELDS {
        let value = row
            .get(field.column())
            .ok_or_else(|| FormError::MissingField(field.column().to_string()))?;

        match (field, value) {
            (Field::Choice(field), FeatureValue::Text(text)) => field.check(text)?,
            (Field::Choice(field), FeatureValue::Number(n))
                if field.column == DRIVER_ALCOHOL && (*n == 0.0 || *n == 1.0) => {}
            (Field::Choice(field), FeatureValue::Number(n)) => {
                field.check(&n.to_string())?;
            }
            (Field::Slider(field), FeatureValue::Number(n)) if n.fract() == 0.0 => {
                field.check(*n as i64)?;
            }
            (Field::Slider(field), other) => {
                let shown = match other {
                    FeatureValue::Number(n) => n.to_string(),
                    FeatureValue::Text(text) => text.clone(),
                };
                return Err(FormError::OutOfRange {
                    column: field.column.to_string(),
                    value: shown,
                    min: field.min,
                    max: field.max,
                });
            }
        }
    }
    Ok(())
}
