//! Feature schema and raw feature rows
//!
//! Column names are part of the train/serve contract: they are matched
//! case- and spelling-sensitively against the columns frozen into an artifact.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const WEATHER: &str = "Weather";
pub const ROAD_TYPE: &str = "Road_Type";
pub const ROAD_CONDITION: &str = "Road_Condition";
pub const ROAD_LIGHT_CONDITION: &str = "Road_Light_Condition";
pub const VEHICLE_TYPE: &str = "Vehicle_Type";
pub const TIME_OF_DAY: &str = "Time_of_Day";
pub const TRAFFIC_DENSITY: &str = "Traffic_Density";

pub const DRIVER_AGE: &str = "Driver_Age";
pub const DRIVER_EXPERIENCE: &str = "Driver_Experience";
pub const DRIVER_ALCOHOL: &str = "Driver_Alcohol";
pub const SPEED_LIMIT: &str = "Speed_Limit";
pub const NUMBER_OF_VEHICLES: &str = "Number_of_Vehicles";

/// Default label column
pub const ACCIDENT: &str = "Accident";

/// Categorical columns in encoding order
pub const CATEGORICAL_COLUMNS: [&str; 7] = [
    WEATHER,
    ROAD_TYPE,
    ROAD_CONDITION,
    ROAD_LIGHT_CONDITION,
    VEHICLE_TYPE,
    TIME_OF_DAY,
    TRAFFIC_DENSITY,
];

/// Numeric passthrough columns in encoding order
pub const NUMERIC_COLUMNS: [&str; 5] = [
    DRIVER_AGE,
    DRIVER_EXPERIENCE,
    DRIVER_ALCOHOL,
    SPEED_LIMIT,
    NUMBER_OF_VEHICLES,
];

/// Numeric columns that accept yes/no style text
pub const BINARY_COLUMNS: [&str; 1] = [DRIVER_ALCOHOL];

/// Which input columns feed the model and which column holds the label
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureSchema {
    /// One-hot encoded columns
    pub categorical: Vec<String>,
    /// Passthrough columns
    pub numeric: Vec<String>,
    /// Subset of `numeric` normalized to 0/1 from text
    pub binary: Vec<String>,
    /// Training label column
    pub label: String,
}

impl FeatureSchema {
    /// The accident schema with a custom label column
    pub fn accident(label: impl Into<String>) -> Self {
        Self {
            categorical: CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            numeric: NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
            binary: BINARY_COLUMNS.iter().map(|c| c.to_string()).collect(),
            label: label.into(),
        }
    }

    /// All feature columns: categorical first, then numeric
    pub fn feature_columns(&self) -> impl Iterator<Item = &str> {
        self.categorical
            .iter()
            .chain(self.numeric.iter())
            .map(String::as_str)
    }

    pub fn is_binary(&self, column: &str) -> bool {
        self.binary.iter().any(|c| c == column)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::accident(ACCIDENT)
    }
}

/// A single raw cell value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}

impl From<i32> for FeatureValue {
    fn from(value: i32) -> Self {
        FeatureValue::Number(value as f64)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Number(value as f64)
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

/// One observation keyed by column name
///
/// Deserializes from a flat JSON object such as
/// `{"Weather": "Clear", "Driver_Age": 30}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FeatureRow {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FeatureValue>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.values.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<FeatureValue> {
        self.values.remove(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
