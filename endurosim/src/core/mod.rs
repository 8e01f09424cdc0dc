pub mod driver;
pub mod race;
pub mod reducer;
pub mod run_race;
pub mod tireset;
