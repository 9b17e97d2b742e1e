// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration — single source of truth for every tunable the spec
//! names but does not pin to one hard value.
//!
//! # Architecture
//!
//! - **Level 1 (static)**: compile-time defaults matching the 1722.1-2013 values
//!   (250 ms AECP/ACMP timeouts, one retransmission).
//! - **Level 2 (dynamic)**: [`EngineConfig`], hot-swappable via [`arc_swap::ArcSwap`]
//!   so a long-lived [`crate::facade::LocalEntity`] can have its timeouts tuned
//!   without taking the `ProtocolInterface` lock (config reads are not part of
//!   the single-lock invariant in spec §5).

use std::time::Duration;

/// EtherType carried by every AVDECC/AVTP frame (spec §6.2).
pub const AVDECC_ETHERTYPE: u16 = 0x22F0;

/// Minimum Ethernet payload length; frames are padded to this on egress.
pub const ETHERNET_MIN_PAYLOAD: usize = 46;

/// Default AECP AEM command timeout (1722.1-2013 default).
pub const DEFAULT_AECP_AEM_TIMEOUT: Duration = Duration::from_millis(250);
/// Default AECP Address Access command timeout.
pub const DEFAULT_AECP_AA_TIMEOUT: Duration = Duration::from_millis(250);
/// Default AECP Milan Vendor-Unique command timeout.
pub const DEFAULT_AECP_MVU_TIMEOUT: Duration = Duration::from_millis(250);
/// Default ACMP command timeout.
pub const DEFAULT_ACMP_TIMEOUT: Duration = Duration::from_millis(250);

/// Default number of send attempts for an AECP command (1 original + 1 retry).
pub const DEFAULT_AECP_MAX_ATTEMPTS: u8 = 2;
/// ACMP commands are not retried at this layer (spec §4.3).
pub const ACMP_MAX_ATTEMPTS: u8 = 1;

/// Discovery: `valid_until` is refreshed to `now + DISCOVERY_VALIDITY_MULTIPLIER * valid_time`.
pub const DISCOVERY_VALIDITY_MULTIPLIER: u32 = 2;

/// How often the timer thread sweeps for expired inflights / stale interfaces.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(50);

/// Initial capacity hint for the per-target inflight hash map.
pub const INFLIGHT_INITIAL_CAPACITY: usize = 16;

/// Bounded channel capacity between transport ingress and the engine thread.
pub const INGRESS_CHANNEL_CAPACITY: usize = 1024;

/// Runtime-tunable engine configuration.
///
/// Cloning is cheap ([`Duration`]s and a `u8`); embedders who want atomic
/// hot-swap should wrap this in an [`arc_swap::ArcSwap<EngineConfig>`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub aecp_aem_timeout: Duration,
    pub aecp_aa_timeout: Duration,
    pub aecp_mvu_timeout: Duration,
    pub acmp_timeout: Duration,
    pub aecp_max_attempts: u8,
    pub discovery_validity_multiplier: u32,
    pub sweep_interval: Duration,
}

impl EngineConfig {
    /// Timeout to use for a given AECP command kind.
    #[must_use]
    pub fn aecp_timeout(&self, kind: crate::types::AecpKind) -> Duration {
        match kind {
            crate::types::AecpKind::Aem => self.aecp_aem_timeout,
            crate::types::AecpKind::Aa => self.aecp_aa_timeout,
            crate::types::AecpKind::Mvu => self.aecp_mvu_timeout,
        }
    }

    /// Validate the configuration; called by [`EngineConfigBuilder::build`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidConfig`] if any timeout is zero or
    /// `aecp_max_attempts` is zero.
    pub fn validate(&self) -> crate::Result<()> {
        if self.aecp_aem_timeout.is_zero()
            || self.aecp_aa_timeout.is_zero()
            || self.aecp_mvu_timeout.is_zero()
            || self.acmp_timeout.is_zero()
        {
            return Err(crate::Error::InvalidConfig(
                "AECP/ACMP timeouts must be non-zero".into(),
            ));
        }
        if self.aecp_max_attempts == 0 {
            return Err(crate::Error::InvalidConfig(
                "aecp_max_attempts must be at least 1".into(),
            ));
        }
        if self.discovery_validity_multiplier == 0 {
            return Err(crate::Error::InvalidConfig(
                "discovery_validity_multiplier must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            aecp_aem_timeout: DEFAULT_AECP_AEM_TIMEOUT,
            aecp_aa_timeout: DEFAULT_AECP_AA_TIMEOUT,
            aecp_mvu_timeout: DEFAULT_AECP_MVU_TIMEOUT,
            acmp_timeout: DEFAULT_ACMP_TIMEOUT,
            aecp_max_attempts: DEFAULT_AECP_MAX_ATTEMPTS,
            discovery_validity_multiplier: DISCOVERY_VALIDITY_MULTIPLIER,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Fluent builder for [`EngineConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn aecp_aem_timeout(mut self, timeout: Duration) -> Self {
        self.config.aecp_aem_timeout = timeout;
        self
    }

    #[must_use]
    pub fn aecp_aa_timeout(mut self, timeout: Duration) -> Self {
        self.config.aecp_aa_timeout = timeout;
        self
    }

    #[must_use]
    pub fn aecp_mvu_timeout(mut self, timeout: Duration) -> Self {
        self.config.aecp_mvu_timeout = timeout;
        self
    }

    #[must_use]
    pub fn acmp_timeout(mut self, timeout: Duration) -> Self {
        self.config.acmp_timeout = timeout;
        self
    }

    #[must_use]
    pub fn aecp_max_attempts(mut self, attempts: u8) -> Self {
        self.config.aecp_max_attempts = attempts;
        self
    }

    /// Validate and produce the final configuration.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::validate`].
    pub fn build(self) -> crate::Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_1722_1_2013_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.aecp_aem_timeout, Duration::from_millis(250));
        assert_eq!(config.acmp_timeout, Duration::from_millis(250));
        assert_eq!(config.aecp_max_attempts, 2);
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let result = EngineConfigBuilder::new()
            .aecp_aem_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(crate::Error::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_zero_attempts() {
        let result = EngineConfigBuilder::new().aecp_max_attempts(0).build();
        assert!(matches!(result, Err(crate::Error::InvalidConfig(_))));
    }

    #[test]
    fn aecp_timeout_selects_by_kind() {
        let config = EngineConfigBuilder::new()
            .aecp_aem_timeout(Duration::from_millis(10))
            .aecp_aa_timeout(Duration::from_millis(20))
            .aecp_mvu_timeout(Duration::from_millis(30))
            .build()
            .expect("valid config");
        assert_eq!(
            config.aecp_timeout(crate::types::AecpKind::Aem),
            Duration::from_millis(10)
        );
        assert_eq!(
            config.aecp_timeout(crate::types::AecpKind::Aa),
            Duration::from_millis(20)
        );
        assert_eq!(
            config.aecp_timeout(crate::types::AecpKind::Mvu),
            Duration::from_millis(30)
        );
    }
}
