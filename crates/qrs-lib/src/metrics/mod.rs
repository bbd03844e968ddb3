pub mod accuracy;
pub mod hrv;
