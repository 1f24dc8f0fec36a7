//! Accident severity form
//!
//! Bounded prompts that collect one accident description, plus formatting
//! for the predicted class and its confidence.

pub mod form;
pub mod render;
pub mod session;

pub use form::{
    collect_answers, validate_row, ChoiceField, Field, FormError, FormSource, SliderField,
    FORM_FIELDS,
};
pub use render::{format_prediction, format_probabilities};
pub use session::{init_predictor, predictor};
