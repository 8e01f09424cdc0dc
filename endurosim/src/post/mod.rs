pub mod race_report;
