// obis.rs — OBIS register table of the Luxembourg "smarty" P1 telegram

/// Which parenthesis group of a line carries the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Select {
    /// `1-0:71.7.0(000*A)` -> `000*A`
    FirstParens,
    /// `0-1:24.2.1(101209112500W)(12785.123*m3)` -> `12785.123*m3`
    LastParens,
}

/// How the selected text is turned into the stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Raw,
    /// Every two hex digits encode one ASCII character.
    HexPairs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterDescriptor {
    pub name: &'static str,
    pub obis_id: &'static str,
    pub unit: &'static str,
    pub select: Select,
    pub encoding: Encoding,
}

impl RegisterDescriptor {
    const fn new(name: &'static str, obis_id: &'static str, unit: &'static str) -> Self {
        Self {
            name,
            obis_id,
            unit,
            select: Select::FirstParens,
            encoding: Encoding::Raw,
        }
    }

    const fn last_parens(mut self) -> Self {
        self.select = Select::LastParens;
        self
    }

    const fn hex_pairs(mut self) -> Self {
        self.encoding = Encoding::HexPairs;
        self
    }
}

const fn reg(name: &'static str, obis_id: &'static str, unit: &'static str) -> RegisterDescriptor {
    RegisterDescriptor::new(name, obis_id, unit)
}

pub const REGISTRY_LEN: usize = 49;

pub static REGISTRY: [RegisterDescriptor; REGISTRY_LEN] = [
    reg("pwr_dlvrd", "1-0:1.7.0", "kW"),
    reg("pwr_rtrnd", "1-0:2.7.0", "kW"),
    reg("react_engy_dlvrd_tariff1", "1-0:3.8.0", "kVArh"),
    reg("react_engy_rtrnd_tariff1", "1-0:4.8.0", "kVArh"),
    reg("act_pwr_p_minus_l1", "1-0:22.7.0", "kW"),
    reg("act_pwr_p_minus_l2", "1-0:42.7.0", "kW"),
    reg("act_pwr_p_minus_l3", "1-0:62.7.0", "kW"),
    reg("act_pwr_p_plus_l1", "1-0:21.7.0", "kW"),
    reg("act_pwr_p_plus_l2", "1-0:41.7.0", "kW"),
    reg("act_pwr_p_plus_l3", "1-0:61.7.0", "kW"),
    reg("appt_export_pwr", "1-0:10.7.0", "kVA"),
    reg("appt_import_pwr", "1-0:9.7.0", "kVA"),
    reg("brkr_ctrl_state_1", "0-1:96.3.10", ""),
    reg("brkr_ctrl_state_2", "0-2:96.3.10", ""),
    reg("elec_failures", "0-0:96.7.21", ""),
    reg("elec_sags_l1", "1-0:32.32.0", ""),
    reg("elec_sags_l2", "1-0:52.32.0", ""),
    reg("elec_sags_l3", "1-0:72.32.0", ""),
    reg("elec_swells_l1", "1-0:32.36.0", ""),
    reg("elec_swells_l2", "1-0:52.36.0", ""),
    reg("elec_swells_l3", "1-0:72.36.0", ""),
    reg("elec_switch_postn", "0-0:96.3.10", ""),
    reg("elec_threshold", "0-0:17.0.0", "kVA"),
    reg("engy_dlvrd_tariff1", "1-0:1.8.0", "kWh"),
    reg("engy_rtrnd_tariff1", "1-0:2.8.0", "kWh"),
    reg("equipment_id", "0-0:42.0.0", "").hex_pairs(),
    reg("gas_index", "0-1:24.2.1", "m3").last_parens(),
    reg("limiter_curr_monitor", "1-1:31.4.0", "A"),
    reg("msg_short", "0-0:96.13.0", ""),
    reg("msg2_long", "0-0:96.13.2", ""),
    reg("msg3_long", "0-0:96.13.3", ""),
    reg("msg4_long", "0-0:96.13.4", ""),
    reg("msg5_long", "0-0:96.13.5", ""),
    reg("p1_version", "1-3:0.2.8", ""),
    reg("phase_curr_l1", "1-0:31.7.0", "A"),
    reg("phase_curr_l2", "1-0:51.7.0", "A"),
    reg("phase_curr_l3", "1-0:71.7.0", "A"),
    reg("phase_volt_l1", "1-0:32.7.0", "V"),
    reg("phase_volt_l2", "1-0:52.7.0", "V"),
    reg("phase_volt_l3", "1-0:72.7.0", "V"),
    reg("react_pwr_dlvrd", "1-0:3.7.0", "kVAr"),
    reg("react_pwr_q_minus_l1", "1-0:24.7.0", "kVAr"),
    reg("react_pwr_q_minus_l2", "1-0:44.7.0", "kVAr"),
    reg("react_pwr_q_minus_l3", "1-0:64.7.0", "kVAr"),
    reg("react_pwr_q_plus_l1", "1-0:23.7.0", "kVAr"),
    reg("react_pwr_q_plus_l2", "1-0:43.7.0", "kVAr"),
    reg("react_pwr_q_plus_l3", "1-0:63.7.0", "kVAr"),
    reg("react_pwr_rtrnd", "1-0:4.7.0", "kVAr"),
    reg("timestamp", "0-0:1.0.0", ""),
];

/// Exact match on the full OBIS id. `1-0:1.7.0` never matches `1-0:1.7.0.1`
/// or `1-0:1.7`.
pub fn lookup_obis(obis_id: &str) -> Option<(usize, &'static RegisterDescriptor)> {
    REGISTRY
        .iter()
        .enumerate()
        .find(|(_, d)| d.obis_id == obis_id)
}

pub fn register_index(name: &str) -> Option<usize> {
    REGISTRY.iter().position(|d| d.name == name)
}

// EOF
