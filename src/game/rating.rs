//! Logistic (ELO) rating updates.

/// Rating assigned to newly registered accounts.
pub const DEFAULT_RATING: i32 = 1000;

/// Default sensitivity of a single result.
pub const DEFAULT_K_FACTOR: f64 = 32.0;

/// A player's score in a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameScore {
    Win,
    Draw,
    Loss,
}

impl GameScore {
    pub const fn value(self) -> f64 {
        match self {
            Self::Win => 1.0,
            Self::Draw => 0.5,
            Self::Loss => 0.0,
        }
    }

    pub const fn inverse(self) -> Self {
        match self {
            Self::Win => Self::Loss,
            Self::Draw => Self::Draw,
            Self::Loss => Self::Win,
        }
    }
}

/// Probability that a player rated `rating` beats one rated `opponent`.
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - rating) / 400.0))
}

/// New rating after scoring `score` against `opponent`, rounded to the nearest integer.
pub fn updated_rating(rating: i32, opponent: i32, score: GameScore, k_factor: f64) -> i32 {
    let delta = k_factor * (score.value() - expected_score(rating, opponent));
    (f64::from(rating) + delta).round() as i32
}

/// Recompute both ratings from their pre-match values.
///
/// Returns `(first_new, second_new)`.
pub fn rate_match(first: i32, second: i32, first_score: GameScore, k_factor: f64) -> (i32, i32) {
    (
        updated_rating(first, second, first_score, k_factor),
        updated_rating(second, first, first_score.inverse(), k_factor),
    )
}
