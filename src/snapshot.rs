// snapshot.rs — register values decoded from one telegram

use serde::ser::SerializeMap;

use crate::*;

pub type RegisterValue = heapless::String<MAX_VALUE_LEN>;

/// Line counters of the last extraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    /// Lines looked at, header and trailer excluded.
    pub lines: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub malformed: usize,
}

/// One value slot per [`REGISTRY`] entry, in registry order.
///
/// Slots are never removed, only emptied by [`RegisterSnapshot::clear`].
/// Serializes as a JSON object of the non-empty registers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterSnapshot {
    values: [RegisterValue; REGISTRY_LEN],
    stats: ExtractStats,
}

impl Default for RegisterSnapshot {
    fn default() -> Self {
        Self {
            values: core::array::from_fn(|_| RegisterValue::new()),
            stats: ExtractStats::default(),
        }
    }
}

impl RegisterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        for value in self.values.iter_mut() {
            value.clear();
        }
        self.stats = ExtractStats::default();
    }

    /// Value of the register called `name`, `None` if unknown or empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        register_index(name)
            .map(|i| self.values[i].as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn get_by_obis(&self, obis_id: &str) -> Option<&str> {
        lookup_obis(obis_id)
            .map(|(i, _)| self.values[i].as_str())
            .filter(|v| !v.is_empty())
    }

    /// `(name, value, unit)` for every register, empty ones included.
    pub fn all(&self) -> impl Iterator<Item = (&'static str, &str, &'static str)> + '_ {
        REGISTRY
            .iter()
            .zip(self.values.iter())
            .map(|(d, v)| (d.name, v.as_str(), d.unit))
    }

    /// Number of registers holding a value.
    pub fn matched(&self) -> usize {
        self.values.iter().filter(|v| !v.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.matched() == 0
    }

    pub fn stats(&self) -> ExtractStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut ExtractStats {
        &mut self.stats
    }

    /// Store `value`, cut to [`MAX_VALUE_LEN`] bytes on a char boundary.
    pub(crate) fn set(&mut self, index: usize, value: &str) {
        let mut end = value.len().min(MAX_VALUE_LEN);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        let slot = &mut self.values[index];
        slot.clear();
        // fits, see above
        let _ = slot.push_str(&value[..end]);
    }

    /// Meter clock from the `timestamp` register, `YYMMDDhhmmss` followed by
    /// `W` (winter) or `S` (summer).
    pub fn meter_time(&self) -> Option<NaiveDateTime> {
        let ts = self.get("timestamp")?;
        NaiveDateTime::parse_from_str(ts.get(..12)?, "%y%m%d%H%M%S").ok()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn log_table(&self) {
        info!("Smarty registers:");
        for (d, value) in REGISTRY.iter().zip(self.values.iter()) {
            info!("{:>12} | {:>33} | {} ({})", d.obis_id, d.name, value, d.unit);
        }
    }
}

impl Serialize for RegisterSnapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.matched()))?;
        for (name, value, _) in self.all().filter(|(_, v, _)| !v.is_empty()) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(name: &str) -> usize {
        register_index(name).unwrap()
    }

    #[test]
    fn starts_empty() {
        let snap = RegisterSnapshot::new();
        assert!(snap.is_empty());
        assert_eq!(snap.all().count(), REGISTRY_LEN);
        assert!(snap.get("pwr_dlvrd").is_none());
    }

    #[test]
    fn set_get_and_clear() {
        let mut snap = RegisterSnapshot::new();
        snap.set(index("phase_volt_l1"), "232.0");

        assert_eq!(snap.get("phase_volt_l1"), Some("232.0"));
        assert_eq!(snap.get_by_obis("1-0:32.7.0"), Some("232.0"));
        assert_eq!(snap.matched(), 1);
        assert!(snap.get("no_such_register").is_none());

        snap.clear();
        assert!(snap.get("phase_volt_l1").is_none());
        // the slot survives a clear
        assert_eq!(snap.all().filter(|(n, _, _)| *n == "phase_volt_l1").count(), 1);
    }

    #[test]
    fn values_are_bounded() {
        let mut snap = RegisterSnapshot::new();
        let long = "A".repeat(100);
        snap.set(index("msg_short"), &long);
        assert_eq!(snap.get("msg_short").unwrap().len(), MAX_VALUE_LEN);

        // multi-byte char straddling the bound
        let text = format!("{}é", "x".repeat(MAX_VALUE_LEN - 1));
        snap.set(index("msg_short"), &text);
        assert_eq!(snap.get("msg_short").unwrap(), "x".repeat(MAX_VALUE_LEN - 1));
    }

    #[test]
    fn all_reports_units() {
        let mut snap = RegisterSnapshot::new();
        snap.set(index("gas_index"), "12785.123");
        let (_, value, unit) = snap.all().find(|(n, _, _)| *n == "gas_index").unwrap();
        assert_eq!(value, "12785.123");
        assert_eq!(unit, "m3");
    }

    #[test]
    fn meter_time_parses_timestamp_register() {
        let mut snap = RegisterSnapshot::new();
        assert!(snap.meter_time().is_none());

        snap.set(index("timestamp"), "210204163628W");
        let t = snap.meter_time().unwrap();
        assert_eq!(t.to_string(), "2021-02-04 16:36:28");

        snap.set(index("timestamp"), "garbage");
        assert!(snap.meter_time().is_none());
    }

    #[test]
    fn json_has_only_filled_registers() {
        let mut snap = RegisterSnapshot::new();
        snap.set(index("pwr_dlvrd"), "00.189");
        snap.set(index("p1_version"), "42");

        let value: serde_json::Value = serde_json::from_str(&snap.to_json().unwrap()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["pwr_dlvrd"], "00.189");
        assert_eq!(obj["p1_version"], "42");
    }
}
// EOF
