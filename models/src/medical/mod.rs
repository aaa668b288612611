// models/src/medical/mod.rs

pub mod appointment;
pub mod billing;
pub mod doctor;
pub mod lab_result;
pub mod medical_record;
pub mod patient;
pub mod prescription;
