pub mod json_records;
