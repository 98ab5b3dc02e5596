// src/models/mod.rs

pub mod exam;
pub mod headquarters;
pub mod submission;
pub mod user;
