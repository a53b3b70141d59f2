use cosmwasm_std::Timestamp;

/// Maps between wall clock time and drand rounds of one network.
///
/// All operations are total. Arithmetic saturates instead of overflowing since
/// timestamps and round numbers can come from untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSchedule {
    genesis: Timestamp,
    /// Round length in nanoseconds
    period: u64,
    /// Only rounds divisible by this are used
    divisor: u64,
}

impl RoundSchedule {
    /// Creates a schedule. A `period` or `divisor` of 0 is treated as 1.
    pub const fn new(genesis: Timestamp, period: u64, divisor: u64) -> Self {
        Self {
            genesis,
            period: if period == 0 { 1 } else { period },
            divisor: if divisor == 0 { 1 } else { divisor },
        }
    }

    pub fn genesis(&self) -> Timestamp {
        self.genesis
    }

    pub fn divisor(&self) -> u64 {
        self.divisor
    }

    // See TimeOfRound implementation: https://github.com/drand/drand/blob/eb36ba81e3f28c966f95bcd602f60e7ff8ef4c35/chain/time.go#L30-L33
    /// The publish time of a round. Round 0 does not exist and maps to genesis.
    pub fn time_of_round(&self, round: u64) -> Timestamp {
        let offset = round.saturating_sub(1).saturating_mul(self.period);
        Timestamp::from_nanos(self.genesis.nanos().saturating_add(offset))
    }

    /// The first round with a publish time strictly greater than `base`.
    pub fn round_after(&self, base: Timestamp) -> u64 {
        // Losely ported from https://github.com/drand/drand/blob/eb36ba81e3f28c966f95bcd602f60e7ff8ef4c35/chain/time.go#L49-L63
        if base < self.genesis {
            1
        } else {
            let from_genesis = base.nanos() - self.genesis.nanos();
            let periods_since_genesis = from_genesis / self.period;
            let next_period_index = periods_since_genesis.saturating_add(1);
            next_period_index.saturating_add(1) // Convert 0-based counting to 1-based counting
        }
    }

    /// Like [`RoundSchedule::round_after`] but rounded up to the next round divisible
    /// by the divisor. Saturates at `u64::MAX`.
    pub fn valid_round_after(&self, base: Timestamp) -> u64 {
        self.valid_round_from(self.round_after(base))
    }

    /// The smallest valid round that is greater than or equal to `round`.
    /// Saturates at `u64::MAX`.
    pub fn valid_round_from(&self, round: u64) -> u64 {
        let round = round.max(1);
        let remainder = round % self.divisor;
        if remainder != 0 {
            round.saturating_add(self.divisor - remainder)
        } else {
            round
        }
    }

    /// Returns true if and only if the round number is used by this schedule.
    ///
    /// If round is 0, this returns false because there is no 0 round in drand.
    #[inline]
    pub fn is_valid(&self, round: u64) -> bool {
        round != 0 && round % self.divisor == 0
    }
}
