// state.rs

use std::sync::atomic::AtomicU32;

use crate::*;

pub struct MyState {
    pub config: RwLock<MyConfig>,
    pub uptime: RwLock<usize>,
    pub meter: RwLock<Option<RegisterSnapshot>>,
    pub data_updated: RwLock<bool>,
    pub cycles_ok: AtomicU32,
    pub cycles_failed: AtomicU32,
    /// Handle the config was loaded through, reused for later writes.
    #[cfg(feature = "esp")]
    pub nvs: RwLock<Option<nvs::EspNvs<nvs::NvsDefault>>>,
}

impl MyState {
    pub fn new(config: MyConfig) -> Self {
        MyState {
            config: RwLock::new(config),
            uptime: RwLock::new(0),
            meter: RwLock::new(None),
            data_updated: RwLock::new(false),
            cycles_ok: 0.into(),
            cycles_failed: 0.into(),
            #[cfg(feature = "esp")]
            nvs: RwLock::new(None),
        }
    }

    #[cfg(feature = "esp")]
    pub fn with_nvs(mut self, nvs: nvs::EspNvs<nvs::NvsDefault>) -> Self {
        self.nvs = RwLock::new(Some(nvs));
        self
    }
}

// EOF
