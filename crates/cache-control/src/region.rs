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

use thiserror::Error as ThisError;

pub const GUARDED_WORDS: usize = 32;

/// Read-only data aligned to and spanning at least one full cache line,
/// so neither a prefetch through a neighbour line nor placement into
/// directly addressable memory could mask a fault.
#[repr(C, align(128))]
pub struct CacheLineAligned(pub [u32; GUARDED_WORDS]);

pub static GUARDED_RODATA: CacheLineAligned = CacheLineAligned({
    let mut words = [0u32; GUARDED_WORDS];
    words[0] = 0x12345678;
    words[1] = 0xfedcba98;
    words
});

/// Where a region physically resides, defines which bus gate it's reached through.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Backing {
    Flash,
    Psram,
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum RegionError {
    #[error("region of {size} bytes is smaller than a cache line of {line_size} bytes")]
    TooSmall { size: usize, line_size: usize },

    #[error("region at {address:#x} isn't aligned to a cache line of {line_size} bytes")]
    Misaligned { address: usize, line_size: usize },

    #[error("region at {address:#x} isn't backed by the cache")]
    NotCacheBacked { address: usize },
}

#[derive(Copy, Clone, Debug)]
pub struct CachedRegion {
    words: &'static [u32],
    backing: Backing,
}

impl CachedRegion {
    /// Creates a region after checking it's at least one cache line long and line aligned.
    pub fn new(
        words: &'static [u32],
        backing: Backing,
        line_size: usize,
    ) -> Result<Self, RegionError> {
        let region = Self { words, backing };

        let size = region.size();
        if size < line_size {
            return Err(RegionError::TooSmall { size, line_size });
        }

        let address = region.address();
        if line_size == 0 || address % line_size != 0 {
            return Err(RegionError::Misaligned { address, line_size });
        }

        Ok(region)
    }

    pub fn guarded_rodata(line_size: usize) -> Result<Self, RegionError> {
        Self::new(&GUARDED_RODATA.0, Backing::Flash, line_size)
    }

    pub fn address(&self) -> usize {
        self.words.as_ptr() as usize
    }

    pub fn size(&self) -> usize {
        std::mem::size_of_val(self.words)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn backing(&self) -> Backing {
        self.backing
    }

    pub fn contains(&self, other: &CachedRegion) -> bool {
        let start = self.address();
        let end = start + self.size();
        other.address() >= start && other.address() + other.size() <= end
    }

    pub(crate) fn word_ptr(&self, index: usize) -> Option<*const u32> {
        self.words.get(index).map(|word| word as *const u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SMALL: [u32; 2] = [1, 2];

    #[test]
    fn guarded_rodata_is_a_valid_region() {
        let region = CachedRegion::guarded_rodata(128).unwrap();
        assert_eq!(region.size(), 128);
        assert_eq!(region.address() % 128, 0);
    }

    #[test]
    fn undersized_region_is_rejected() {
        let error = CachedRegion::new(&SMALL, Backing::Flash, 64).unwrap_err();
        assert_eq!(
            error,
            RegionError::TooSmall {
                size: 8,
                line_size: 64
            }
        );
    }

    #[test]
    fn misaligned_region_is_rejected() {
        // the second word of an aligned block is never line aligned
        let words = &GUARDED_RODATA.0[1..];
        let error = CachedRegion::new(words, Backing::Flash, 64).unwrap_err();
        assert!(matches!(error, RegionError::Misaligned { .. }));
    }
}
