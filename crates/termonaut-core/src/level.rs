//! Level progression helpers.

/// Levels at which an avatar visibly evolves.
pub const EVOLUTION_LEVELS: [u32; 5] = [5, 10, 20, 50, 100];

/// Bucket that changes every five levels.
#[must_use]
pub fn level_tier(level: u32) -> u32 {
    level / 5
}

/// The next evolution milestone above `level`, or `None` once maxed out.
#[must_use]
pub fn next_evolution_level(level: u32) -> Option<u32> {
    EVOLUTION_LEVELS.iter().copied().find(|&l| level < l)
}
