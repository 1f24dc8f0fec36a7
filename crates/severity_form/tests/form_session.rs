//! Form answers through to a prediction from a freshly trained artifact

use anyhow::Result;
use std::collections::{BTreeMap, VecDeque};
use std::io::Write;
use tempfile::tempdir;

use traffic_severity_core::{FeatureValue, SeverityConfig, Tone};
use traffic_severity_form::{
    collect_answers, format_prediction, init_predictor, predictor, validate_row, ChoiceField,
    FormError, FormSource, SliderField,
};
use traffic_severity_trainer::{train_artifact_from_csv, TrainingParams};

/// Answers in asking order; choices and numbers kept apart
#[derive(Default)]
struct ScriptedForm {
    choices: VecDeque<&'static str>,
    numbers: VecDeque<i64>,
}

impl ScriptedForm {
    fn scenario() -> Self {
        Self {
            choices: VecDeque::from([
                "Clear", "Dry", "Highway", "Low", "Daylight", "Car", "No", "Morning",
            ]),
            numbers: VecDeque::from([2, 30, 5, 60]),
        }
    }
}

impl FormSource for ScriptedForm {
    fn choose(&mut self, _field: &ChoiceField) -> Result<String, FormError> {
        self.choices
            .pop_front()
            .map(str::to_string)
            .ok_or(FormError::Cancelled)
    }

    fn slide(&mut self, _field: &SliderField) -> Result<i64, FormError> {
        self.numbers.pop_front().ok_or(FormError::Cancelled)
    }
}

fn write_training_csv(path: &std::path::Path) -> Result<()> {
    let weather = ["Clear", "Overcast", "Rain", "Fog", "Snow", "Thunderstorm"];
    let road = ["Highway", "Main Road", "Residential", "Rural", "Service Road"];
    let condition = ["Dry", "Wet", "Icy", "Snowy", "Muddy"];
    let density = ["Low", "Medium", "High", "Very High", "Standstill"];
    let light = ["Daylight", "Dark - Street Lights", "Dark - No Lights"];
    let vehicle = ["Car", "Truck", "Bus", "Motorcycle", "Bicycle", "Pedestrian"];
    let time = ["Morning", "Afternoon", "Evening", "Night"];

    let mut file = std::fs::File::create(path)?;
    writeln!(
        file,
        "Weather,Road_Type,Time_of_Day,Traffic_Density,Speed_Limit,Number_of_Vehicles,\
Driver_Alcohol,Road_Condition,Vehicle_Type,Driver_Age,Driver_Experience,\
Road_Light_Condition,Accident"
    )?;
    for i in 0..120usize {
        let speed = 20 + (i * 23 % 121);
        let alcohol = if i % 6 == 0 { "Yes" } else { "No" };
        let label = if alcohol == "Yes" || speed >= 110 {
            2
        } else if speed >= 70 {
            1
        } else {
            0
        };
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            weather[i % weather.len()],
            road[i % road.len()],
            time[i % time.len()],
            density[i % density.len()],
            speed,
            1 + i % 5,
            alcohol,
            condition[i % condition.len()],
            vehicle[i % vehicle.len()],
            16 + i % 60,
            i % 40,
            light[i % light.len()],
            label
        )?;
    }
    Ok(())
}

#[test]
fn test_scripted_answers_build_a_valid_row() -> Result<()> {
    let row = collect_answers(&mut ScriptedForm::scenario())?;

    assert_eq!(row.len(), 12);
    assert_eq!(row.get("Weather"), Some(&FeatureValue::Text("Clear".into())));
    assert_eq!(row.get("Driver_Alcohol"), Some(&FeatureValue::Number(0.0)));
    assert_eq!(row.get("Speed_Limit"), Some(&FeatureValue::Number(60.0)));
    validate_row(&row)?;
    Ok(())
}

#[test]
fn test_out_of_range_answer_is_rejected() {
    let mut form = ScriptedForm::scenario();
    // Number_of_Vehicles
    form.numbers[0] = 1001;

    let err = collect_answers(&mut form).unwrap_err();
    assert!(matches!(err, FormError::OutOfRange { max: 1000, .. }));
}

#[test]
fn test_unknown_choice_is_rejected() {
    let mut form = ScriptedForm::scenario();
    form.choices[0] = "Sandstorm";

    let err = collect_answers(&mut form).unwrap_err();
    assert!(matches!(err, FormError::NotAnOption { .. }));
}

#[test]
fn test_running_out_of_answers_cancels() {
    let mut form = ScriptedForm {
        choices: VecDeque::from(["Clear"]),
        numbers: VecDeque::new(),
    };
    assert!(matches!(collect_answers(&mut form), Err(FormError::Cancelled)));
}

#[test]
fn test_json_rows_are_checked() -> Result<()> {
    let row: traffic_severity_core::FeatureRow = serde_json::from_str(
        r#"{
            "Weather": "Rain", "Road_Condition": "Wet", "Road_Type": "Rural",
            "Traffic_Density": "High", "Road_Light_Condition": "Dark - No Lights",
            "Vehicle_Type": "Truck", "Number_of_Vehicles": 3, "Driver_Age": 45,
            "Driver_Experience": 20, "Driver_Alcohol": 1, "Speed_Limit": 90,
            "Time_of_Day": "Night", "Notes": "ignored"
        }"#,
    )?;
    validate_row(&row)?;

    let mut young = row.clone();
    young.insert("Driver_Age", 12);
    assert!(matches!(validate_row(&young), Err(FormError::OutOfRange { .. })));

    let mut fractional = row.clone();
    fractional.insert("Speed_Limit", 60.5);
    assert!(validate_row(&fractional).is_err());

    let mut partial = row;
    partial.remove("Time_of_Day");
    assert!(matches!(validate_row(&partial), Err(FormError::MissingField(c)) if c == "Time_of_Day"));
    Ok(())
}

#[test]
fn test_session_predicts_form_answers() -> Result<()> {
    let dir = tempdir()?;
    let csv = dir.path().join("accidents.csv");
    let model = dir.path().join("accident_model.json");
    write_training_csv(&csv)?;

    let params = TrainingParams {
        n_estimators: 15,
        label_names: BTreeMap::from([
            ("0".to_string(), "Low".to_string()),
            ("1".to_string(), "Medium".to_string()),
            ("2".to_string(), "High".to_string()),
        ]),
        ..TrainingParams::default()
    };
    train_artifact_from_csv(&csv, &model, params)?;

    // Missing artifacts fail without filling the cell
    assert!(init_predictor(&dir.path().join("absent.json"), true).is_err());
    assert!(predictor().is_none());

    let loaded = init_predictor(&model, true)?;
    assert!(std::ptr::eq(loaded, init_predictor(&model, true)?));

    let row = collect_answers(&mut ScriptedForm::scenario())?;
    let prediction = loaded.predict(&row)?;
    assert!(["Low", "Medium", "High"].contains(&prediction.label.as_str()));
    let percent = prediction.confidence_percent();
    assert!((0.0..=100.0).contains(&percent), "confidence {percent}");

    let config = SeverityConfig::default();
    let tone = config.labels.tone_for(&prediction.label);
    assert_ne!(tone, Tone::Info);

    colored::control::set_override(false);
    let line = format_prediction(&prediction, tone);
    assert!(line.contains(&format!("Predicted Severity: {}", prediction.label)));
    assert!(line.ends_with(&format!("({percent:.2}%)")));
    Ok(())
}
