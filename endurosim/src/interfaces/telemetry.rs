use crate::core::driver::DriverPars;
use crate::core::tireset::Compound;
use serde::Deserialize;

/// Fallback colors used when a telemetry record carries no team color.
pub const FALLBACK_COLORS: [&str; 10] = [
    "#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#FF00FF", "#00FFFF", "#FFA500", "#800080",
    "#A52A2A", "#008000",
];

/// TelemetryDriverRecord mirrors one record of the telemetry collaborator's driver endpoint.
/// Everything except the driver number may be missing or null.
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryDriverRecord {
    pub driver_number: u32,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub name_acronym: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub team_colour: Option<String>,
    #[serde(default)]
    pub tire_compound: Option<String>,
}

/// map_driver_pars maps raw telemetry records into driver parameters, defaulting missing
/// fields one by one instead of failing the whole load.
pub fn map_driver_pars(records: &[TelemetryDriverRecord]) -> Vec<DriverPars> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let name = record
                .full_name
                .clone()
                .filter(|s| !s.trim().is_empty())
                .or_else(|| compose_name(record))
                .unwrap_or_else(|| format!("Driver {}", record.driver_number));

            let code = record
                .name_acronym
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| derive_code(&name, record.driver_number));

            let color = record
                .team_colour
                .clone()
                .filter(|s| !s.trim().is_empty())
                .map(|c| if c.starts_with('#') { c } else { format!("#{}", c) })
                .unwrap_or_else(|| FALLBACK_COLORS[i % FALLBACK_COLORS.len()].to_string());

            let compound = record
                .tire_compound
                .as_deref()
                .map(Compound::from_name)
                .unwrap_or(Compound::Medium);

            DriverPars {
                id: record.driver_number,
                name,
                code,
                color,
                compound,
            }
        })
        .collect()
}

fn compose_name(record: &TelemetryDriverRecord) -> Option<String> {
    let name = format!(
        "{} {}",
        record.first_name.as_deref().unwrap_or(""),
        record.last_name.as_deref().unwrap_or("")
    )
    .trim()
    .to_string();

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// derive_code builds a 3-letter short code from the driver name, falling back to the driver
/// number when the name has no usable letters.
fn derive_code(name: &str, driver_number: u32) -> String {
    let letters: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_uppercase();

    if letters.is_empty() {
        format!("{:03}", driver_number)
    } else {
        letters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_record(driver_number: u32) -> TelemetryDriverRecord {
        TelemetryDriverRecord {
            driver_number,
            full_name: None,
            first_name: None,
            last_name: None,
            name_acronym: None,
            team_name: None,
            team_colour: None,
            tire_compound: None,
        }
    }

    #[test]
    fn bare_record_gets_full_defaults() {
        let pars = map_driver_pars(&[bare_record(14)]);

        assert_eq!(pars.len(), 1);
        assert_eq!(pars[0].id, 14);
        assert_eq!(pars[0].name, "Driver 14");
        assert_eq!(pars[0].code, "DRI");
        assert_eq!(pars[0].color, FALLBACK_COLORS[0]);
        assert_eq!(pars[0].compound, Compound::Medium);
    }

    #[test]
    fn partial_record_is_filled_field_by_field() {
        let mut record = bare_record(7);
        record.first_name = Some("Kenji".to_string());
        record.last_name = Some("Mori".to_string());
        record.team_colour = Some("3671C6".to_string());
        record.tire_compound = Some("soft".to_string());

        let pars = map_driver_pars(&[record]);

        assert_eq!(pars[0].name, "Kenji Mori");
        assert_eq!(pars[0].code, "KEN");
        assert_eq!(pars[0].color, "#3671C6");
        assert_eq!(pars[0].compound, Compound::Soft);
    }

    #[test]
    fn unknown_compound_defaults_to_medium() {
        let mut record = bare_record(3);
        record.tire_compound = Some("hypersoft".to_string());

        let pars = map_driver_pars(&[record]);
        assert_eq!(pars[0].compound, Compound::Medium);
    }

    #[test]
    fn record_order_cycles_the_fallback_palette() {
        let records: Vec<TelemetryDriverRecord> = (1..=12).map(bare_record).collect();
        let pars = map_driver_pars(&records);

        assert_eq!(pars[0].color, FALLBACK_COLORS[0]);
        assert_eq!(pars[10].color, FALLBACK_COLORS[0]);
        assert_eq!(pars[11].color, FALLBACK_COLORS[1]);
    }

    #[test]
    fn records_parse_with_null_fields() {
        let json = r#"[{"driver_number": 44, "full_name": null, "name_acronym": "HAM",
                        "team_name": null, "team_colour": null}]"#;
        let records: Vec<TelemetryDriverRecord> = serde_json::from_str(json).unwrap();
        let pars = map_driver_pars(&records);

        assert_eq!(pars[0].name, "Driver 44");
        assert_eq!(pars[0].code, "HAM");
    }
}
