pub mod gateway;
pub mod lifecycle;
pub mod questionnaire;
