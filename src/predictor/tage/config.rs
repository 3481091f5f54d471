
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::history::*;
use crate::predictor::*;
use crate::predictor::tage::hash;

/// Configuration for a [`TageBaseComponent`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TageBaseConfig {
    /// Parameters for the saturating counters
    pub ctr: CounterConfig,

    /// log2(number of entries)
    pub index_bits: usize,
}
impl TageBaseConfig {
    /// Number of entries
    pub fn size(&self) -> usize { 1 << self.index_bits }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        self.ctr.storage_bits() * self.size()
    }

    /// Use this configuration to create a new [`TageBaseComponent`].
    pub fn build(self) -> TageBaseComponent {
        TageBaseComponent {
            data: vec![self.ctr.build(); self.size()],
            cfg: self,
        }
    }
}

fn default_useful_bits() -> usize { 2 }

/// Configuration for a [`TageComponent`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TageComponentConfig {
    /// Number of global history bits folded into the index
    pub history_len: usize,

    /// log2(number of entries)
    pub index_bits: usize,

    /// Number of tag bits
    pub tag_bits: usize,

    /// Number of bits in the 'useful' counter
    #[serde(default = "default_useful_bits")]
    pub useful_bits: usize,

    /// Parameters for the saturating counters
    pub ctr: CounterConfig,

    /// Salt mixed into indexes and tags. When unset, one is derived from
    /// the position of the component.
    #[serde(default)]
    pub salt: Option<u32>,
}
impl TageComponentConfig {
    pub fn new(history_len: usize, index_bits: usize, tag_bits: usize,
        ctr: CounterConfig) -> Self
    {
        Self {
            history_len,
            index_bits,
            tag_bits,
            useful_bits: default_useful_bits(),
            ctr,
            salt: None,
        }
    }

    /// Number of entries
    pub fn size(&self) -> usize { 1 << self.index_bits }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        let entry_size =
            self.ctr.storage_bits() +
            self.useful_bits +
            self.tag_bits;
        entry_size * self.size()
    }

    /// Use this configuration to create the [`TageComponent`] at position
    /// 'id' in the predictor.
    pub fn build(self, id: usize) -> TageComponent {
        let salt = self.salt.unwrap_or_else(|| hash::default_salt(id));
        let index_csr = FoldedHistoryRegister::new(self.history_len);
        let tag_csr = FoldedHistoryRegister::new(
            hash::tag_history_len(id, self.history_len)
        );
        let entry = TageEntry::new(self.ctr.build(), self.useful_bits);
        let data = vec![entry; self.size()];
        TageComponent {
            id,
            cfg: self,
            salt,
            data,
            index_csr,
            tag_csr,
        }
    }
}


/// Configuration for a [`TagePredictor`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TageConfig {
    /// Base component configuration
    pub base: TageBaseConfig,

    /// Tagged component configurations, by increasing history length
    pub comp: Vec<TageComponentConfig>,

    /// Length of the global history register
    pub history_bits: usize,

    /// 'useful' counters are aged every 2^n updates
    pub aging_period_log2: u32,
}
impl TageConfig {
    pub fn new(base: TageBaseConfig, history_bits: usize) -> Self {
        Self {
            base,
            comp: Vec::new(),
            history_bits,
            aging_period_log2: 18,
        }
    }

    /// A large configuration: a 64K-entry base component and 14 tagged
    /// components with history lengths between 4 and 800.
    pub fn large() -> Self {
        let mut cfg = Self::new(TageBaseConfig {
            ctr: CounterConfig::UNSIGNED_2BIT,
            index_bits: 16,
        }, 1024);

        let history = [ 4, 8, 12, 16, 24, 32, 48, 64, 96, 128, 192, 256, 512, 800 ];
        let index_bits = [ 13, 13, 13, 13, 13, 13, 14, 14, 14, 14, 14, 14, 15, 15 ];
        let tag_bits = [ 10, 10, 10, 10, 10, 10, 12, 12, 12, 13, 13, 13, 14, 15 ];
        for i in 0..history.len() {
            cfg.add_component(TageComponentConfig::new(
                history[i], index_bits[i], tag_bits[i],
                CounterConfig::SIGNED_3BIT,
            ));
        }
        cfg
    }

    /// A small (32KiB) configuration: an 8K-entry base component and four
    /// 4K-entry tagged components.
    pub fn small() -> Self {
        let mut cfg = Self::new(TageBaseConfig {
            ctr: CounterConfig::UNSIGNED_2BIT,
            index_bits: 13,
        }, 64);

        for (history_len, tag_bits) in [(5, 9), (11, 10), (23, 10), (47, 11)] {
            cfg.add_component(TageComponentConfig::new(
                history_len, 12, tag_bits, CounterConfig::UNSIGNED_3BIT,
            ));
        }
        cfg
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json(&s)
    }

    /// Read a configuration from a JSON string.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn total_entries(&self) -> usize {
        let c: usize = self.comp.iter().map(|c| c.size()).sum();
        self.base.size() + c
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        let c: usize = self.comp.iter().map(|c| c.storage_bits()).sum();
        c + self.base.storage_bits() + self.history_bits
    }

    /// Add a tagged component to the predictor.
    pub fn add_component(&mut self, c: TageComponentConfig) {
        self.comp.push(c);

        // Components are always kept in order of increasing history length.
        self.comp.sort_by_key(|c| c.history_len);
    }

    /// Check that this configuration describes a predictor we can build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.comp.is_empty() {
            return Err(ConfigError::NoComponents);
        }
        if !self.history_bits.is_power_of_two() {
            return Err(ConfigError::HistoryCapacity(self.history_bits));
        }
        if !(1..=31).contains(&self.aging_period_log2) {
            return Err(ConfigError::AgingPeriod(self.aging_period_log2));
        }

        let check_counter = |what: String, c: &CounterConfig| {
            if c.is_valid() {
                Ok(())
            } else {
                Err(ConfigError::Counter {
                    what, min: c.min, max: c.max,
                    threshold: c.threshold, init: c.init,
                })
            }
        };

        if !(1..=24).contains(&self.base.index_bits) {
            return Err(ConfigError::IndexBits {
                what: "base component".to_string(),
                bits: self.base.index_bits,
            });
        }
        check_counter("base component".to_string(), &self.base.ctr)?;

        let mut prev = 0;
        for (comp, c) in self.comp.iter().enumerate() {
            if c.history_len == 0 {
                return Err(ConfigError::ZeroHistory { comp });
            }
            if comp != 0 && c.history_len <= prev {
                return Err(ConfigError::HistoryOrder {
                    comp, len: c.history_len, prev,
                });
            }
            prev = c.history_len;

            if !(1..=24).contains(&c.index_bits) {
                return Err(ConfigError::IndexBits {
                    what: format!("component {}", comp),
                    bits: c.index_bits,
                });
            }
            if !(1..=16).contains(&c.tag_bits) {
                return Err(ConfigError::TagBits { comp, bits: c.tag_bits });
            }
            if !(1..=8).contains(&c.useful_bits) {
                return Err(ConfigError::UsefulBits { comp, bits: c.useful_bits });
            }
            check_counter(format!("component {}", comp), &c.ctr)?;

            let len = c.history_len.max(hash::tag_history_len(comp, c.history_len));
            if len > self.history_bits {
                return Err(ConfigError::HistoryTooShort {
                    comp, len, cap: self.history_bits,
                });
            }
        }
        Ok(())
    }

    /// Use this configuration to create a new [`TagePredictor`].
    pub fn build(self) -> Result<TagePredictor, ConfigError> {
        self.validate()?;
        debug!("building TAGE: {} tagged components, {} entries, {} bits",
            self.comp.len(), self.total_entries(), self.storage_bits()
        );

        let cfg = self.clone();
        let comp = self.comp.into_iter().enumerate()
            .map(|(id, c)| c.build(id))
            .collect::<Vec<TageComponent>>();
        let base = self.base.build();
        let ghr = HistoryRegister::new(self.history_bits);
        let stat = TageStats::new(comp.len());
        Ok(TagePredictor::new(cfg, base, comp, ghr, stat))
    }
}
