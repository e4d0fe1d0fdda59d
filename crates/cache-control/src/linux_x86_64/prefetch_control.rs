/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */
use once_cell::sync::Lazy;
use raw_cpuid::CpuId;

pub static PREFETCH_CONTROL: Lazy<PrefetchControl> = Lazy::new(PrefetchControl::detect);

/// Where the hardware prefetchers of this CPU are switched off.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrefetchControl {
    /// MISC_FEATURE_CONTROL, bits 0..=3 disable the L2 streamer, the L2 adjacent line,
    /// the DCU streamer and the DCU IP prefetchers.
    IntelMiscFeature,
    /// PrefetchControl of family 19h and later, bits 0..=3 and 5 disable the L1 stream,
    /// L1 stride, L1 region, L2 stream and L2 up/down prefetchers.
    AmdPrefetchControl,
    Unsupported,
}

impl PrefetchControl {
    const INTEL_MISC_FEATURE_CONTROL: u32 = 0x1a4;
    const INTEL_DISABLE_BITS: u64 = 0b1111;

    const AMD_PREFETCH_CONTROL: u32 = 0xc000_0108;
    const AMD_DISABLE_BITS: u64 = 0b10_1111;
    const AMD_FIRST_FAMILY: u8 = 0x19;

    pub fn detect() -> Self {
        let cpuid = CpuId::new();
        let vendor = cpuid.get_vendor_info();
        let family = cpuid.get_feature_info().map(|info| info.family_id());

        let control = match (vendor.as_ref().map(|v| v.as_str()), family) {
            (Some("GenuineIntel"), _) => Self::IntelMiscFeature,
            (Some("AuthenticAMD"), Some(family)) if family >= Self::AMD_FIRST_FAMILY => {
                Self::AmdPrefetchControl
            }
            _ => Self::Unsupported,
        };
        tracing::debug!("prefetch control detected as {control:?}, cpu family {family:?}");

        control
    }

    pub fn register(&self) -> Option<u32> {
        match self {
            Self::IntelMiscFeature => Some(Self::INTEL_MISC_FEATURE_CONTROL),
            Self::AmdPrefetchControl => Some(Self::AMD_PREFETCH_CONTROL),
            Self::Unsupported => None,
        }
    }

    /// Bits that are all set while the prefetchers are off.
    pub fn disable_bits(&self) -> u64 {
        match self {
            Self::IntelMiscFeature => Self::INTEL_DISABLE_BITS,
            Self::AmdPrefetchControl => Self::AMD_DISABLE_BITS,
            Self::Unsupported => 0,
        }
    }

    pub fn guards_off(&self, value: u64) -> u64 {
        value | self.disable_bits()
    }

    /// Guards count as enabled unless every prefetcher of the set is off.
    pub fn guards_enabled(&self, value: u64) -> bool {
        let bits = self.disable_bits();
        bits == 0 || value & bits != bits
    }
}

#[cfg(test)]
mod tests {
    use super::PrefetchControl;

    #[test]
    fn intel_guards_keep_unrelated_bits() {
        let control = PrefetchControl::IntelMiscFeature;

        let off = control.guards_off(0x100);
        assert_eq!(off, 0x10f);
        assert!(!control.guards_enabled(off));
        assert!(control.guards_enabled(0x107));
    }

    #[test]
    fn amd_guards_need_every_prefetcher_off() {
        let control = PrefetchControl::AmdPrefetchControl;

        assert!(!control.guards_enabled(control.guards_off(0)));
        // L2 up/down prefetcher is still on
        assert!(control.guards_enabled(0b1111));
    }

    #[test]
    fn unsupported_cpu_is_always_enabled() {
        let control = PrefetchControl::Unsupported;

        assert_eq!(control.register(), None);
        assert!(control.guards_enabled(u64::MAX));
    }
}
