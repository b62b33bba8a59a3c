use crate::error::{Error, Result};
use crate::model::WaveSpec;

pub const DEFAULT_CONCURRENCY_DIVISOR: u64 = 5;

/// Ascending wave sizes of the staged schedule.
pub const DEFAULT_STAGES: [u64; 5] = [500, 800, 1000, 2000, 5000];

/// Additive growth once the staged schedule has run past its last stage.
pub const DEFAULT_STAGE_STEP: u64 = 5000;

const DOUBLING_INITIAL: u64 = 100;
const STAGED_INITIAL: u64 = 200;

/// Growth schedule for wave sizes.
///
/// `next_request_count(n) > n` must hold for every reachable `n`, otherwise the escalation
/// loop could not make progress towards the cap.
pub trait SizingPolicy {
    fn initial_request_count(&self) -> u64;

    fn next_request_count(&self, current: u64) -> u64;

    fn wave_spec(&self, request_count: u64) -> WaveSpec;
}

/// Schedule kind (the string form used by the CLI/config file).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
pub enum PolicyKind {
    #[default]
    #[strum(to_string = "doubling", serialize = "double")]
    Doubling,

    #[strum(to_string = "staged", serialize = "stages")]
    Staged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WavePolicy {
    /// `next = current * 2`.
    Doubling {
        initial: u64,
        concurrency_divisor: u64,
    },

    /// Next stage above `current`; past the last stage, `current + step`.
    Staged {
        initial: u64,
        stages: Vec<u64>,
        step: u64,
        concurrency_divisor: u64,
    },
}

impl WavePolicy {
    /// Builds a policy of the given kind, falling back to the kind's default initial size.
    pub fn new(kind: PolicyKind, initial: Option<u64>, concurrency_divisor: u64) -> Result<Self> {
        if concurrency_divisor == 0 {
            return Err(Error::InvalidConcurrencyDivisor);
        }
        if initial == Some(0) {
            return Err(Error::InvalidInitialRequestCount);
        }

        Ok(match kind {
            PolicyKind::Doubling => Self::Doubling {
                initial: initial.unwrap_or(DOUBLING_INITIAL),
                concurrency_divisor,
            },
            PolicyKind::Staged => Self::Staged {
                initial: initial.unwrap_or(STAGED_INITIAL),
                stages: DEFAULT_STAGES.to_vec(),
                step: DEFAULT_STAGE_STEP,
                concurrency_divisor,
            },
        })
    }

    #[must_use]
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Doubling { .. } => PolicyKind::Doubling,
            Self::Staged { .. } => PolicyKind::Staged,
        }
    }

    fn concurrency_divisor(&self) -> u64 {
        match self {
            Self::Doubling {
                concurrency_divisor,
                ..
            }
            | Self::Staged {
                concurrency_divisor,
                ..
            } => *concurrency_divisor,
        }
    }
}

impl SizingPolicy for WavePolicy {
    fn initial_request_count(&self) -> u64 {
        match self {
            Self::Doubling { initial, .. } | Self::Staged { initial, .. } => *initial,
        }
    }

    fn next_request_count(&self, current: u64) -> u64 {
        match self {
            Self::Doubling { .. } => current.saturating_mul(2).max(current.saturating_add(1)),
            Self::Staged { stages, step, .. } => stages
                .iter()
                .copied()
                .find(|stage| *stage > current)
                .unwrap_or_else(|| current.saturating_add((*step).max(1))),
        }
    }

    fn wave_spec(&self, request_count: u64) -> WaveSpec {
        WaveSpec::derive(request_count, self.concurrency_divisor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(kind: PolicyKind) -> WavePolicy {
        WavePolicy::new(kind, None, DEFAULT_CONCURRENCY_DIVISOR)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn sizes(p: &WavePolicy, n: usize) -> Vec<u64> {
        let mut out = Vec::with_capacity(n);
        let mut cur = p.initial_request_count();
        for _ in 0..n {
            out.push(cur);
            cur = p.next_request_count(cur);
        }
        out
    }

    #[test]
    fn doubling_schedule_from_default_initial() {
        let p = policy(PolicyKind::Doubling);
        assert_eq!(sizes(&p, 5), vec![100, 200, 400, 800, 1600]);
    }

    #[test]
    fn staged_schedule_turns_additive_after_last_stage() {
        let p = policy(PolicyKind::Staged);
        assert_eq!(
            sizes(&p, 9),
            vec![200, 500, 800, 1000, 2000, 5000, 10000, 15000, 20000]
        );
    }

    #[test]
    fn staged_schedule_skips_to_next_stage_from_odd_values() {
        let p = policy(PolicyKind::Staged);
        assert_eq!(p.next_request_count(1), 500);
        assert_eq!(p.next_request_count(500), 800);
        assert_eq!(p.next_request_count(999), 1000);
        assert_eq!(p.next_request_count(4999), 5000);
        assert_eq!(p.next_request_count(7000), 12000);
    }

    #[test]
    fn next_request_count_always_progresses() {
        let samples = [
            1,
            2,
            3,
            99,
            100,
            499,
            500,
            501,
            4999,
            5000,
            5001,
            1 << 20,
            u64::MAX / 4,
            u64::MAX / 2,
        ];
        for kind in [PolicyKind::Doubling, PolicyKind::Staged] {
            let p = policy(kind);
            for n in samples {
                assert!(
                    p.next_request_count(n) > n,
                    "{kind}: next({n}) = {}",
                    p.next_request_count(n)
                );
            }
        }
    }

    #[test]
    fn wave_spec_uses_configured_divisor() {
        let p = WavePolicy::new(PolicyKind::Doubling, Some(800), 4)
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(
            p.wave_spec(800),
            WaveSpec {
                request_count: 800,
                concurrency: 200
            }
        );
    }

    #[test]
    fn rejects_zero_initial_and_divisor() {
        assert!(matches!(
            WavePolicy::new(PolicyKind::Staged, Some(0), 5),
            Err(Error::InvalidInitialRequestCount)
        ));
        assert!(matches!(
            WavePolicy::new(PolicyKind::Doubling, None, 0),
            Err(Error::InvalidConcurrencyDivisor)
        ));
    }

    #[test]
    fn policy_kind_round_trips_through_strings() {
        assert_eq!("staged".parse::<PolicyKind>().ok(), Some(PolicyKind::Staged));
        assert_eq!("double".parse::<PolicyKind>().ok(), Some(PolicyKind::Doubling));
        assert_eq!(PolicyKind::Staged.to_string(), "staged");
        assert_eq!(policy(PolicyKind::Staged).kind(), PolicyKind::Staged);
    }
}
