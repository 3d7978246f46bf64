// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use crate::entry::CacheEntry;

/// Scoring view of a stored entry.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub key: String,
    pub size_bytes: u64,
    /// Epoch millis
    pub last_access_time: u64,
    pub access_count: u64,
    pub priority: u8,
}

impl Candidate {
    pub fn from_entry(key: &str, entry: &CacheEntry) -> Self {
        Self {
            key: key.to_string(),
            size_bytes: entry.metadata.size_bytes,
            last_access_time: entry.metadata.last_access_time,
            access_count: entry.metadata.access_count,
            priority: entry.metadata.priority,
        }
    }

    pub fn idle_secs(&self, now: u64) -> f64 {
        now.saturating_sub(self.last_access_time) as f64 / 1000.0
    }
}

/// Tan curve eviction policy combining recency, frequency, size and priority.
pub struct TanCurvePolicy {
    /// Half-life for recency decay (seconds)
    pub recency_half_life: f64,
    /// Max access count for normalization
    pub max_access_count: u64,
    /// Baseline size in bytes for size scoring
    pub baseline_size_bytes: u64,
    /// Weights for each component (recency, frequency, size, priority)
    pub weights: (f64, f64, f64, f64),
}

impl Default for TanCurvePolicy {
    fn default() -> Self {
        Self {
            recency_half_life: 3600.0, // 1 hour
            max_access_count: 1000,
            baseline_size_bytes: 1024 * 1024, // 1 MB
            weights: (0.35, 0.35, 0.15, 0.15),
        }
    }
}

impl TanCurvePolicy {
    /// Calculate retention score (0.0 = move out first, 1.0 = keep)
    pub fn calculate_score(&self, candidate: &Candidate, now: u64) -> f64 {
        let recency = (-candidate.idle_secs(now) / self.recency_half_life).exp();

        let frequency = if candidate.access_count == 0 {
            0.0
        } else {
            let count = candidate.access_count.min(self.max_access_count) as f64;
            (1.0 + count).ln() / (1.0 + self.max_access_count as f64).ln()
        };

        let size_mb = candidate.size_bytes as f64 / self.baseline_size_bytes as f64;
        let size_score = 1.0 / (1.0 + size_mb);

        let priority = f64::from(candidate.priority.min(9)) / 9.0;

        recency * self.weights.0
            + frequency * self.weights.1
            + size_score * self.weights.2
            + priority * self.weights.3
    }

    /// Lowest-scoring keys whose sizes add up to at least `bytes_to_free`.
    ///
    /// Returns fewer bytes than asked only when the candidates run out.
    pub fn select_victims(&self, candidates: &[Candidate], bytes_to_free: u64, now: u64) -> Vec<String> {
        if bytes_to_free == 0 {
            return Vec::new();
        }

        let mut scored: Vec<_> = candidates
            .iter()
            .map(|c| (c, self.calculate_score(c, now)))
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut freed = 0u64;
        let mut victims = Vec::new();
        for (candidate, _) in scored {
            if freed >= bytes_to_free {
                break;
            }
            freed = freed.saturating_add(candidate.size_bytes);
            victims.push(candidate.key.clone());
        }
        victims
    }
}
