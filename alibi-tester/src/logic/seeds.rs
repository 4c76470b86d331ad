//! Seed parsing: plain numbers or invite codes.

use alibi_game::{GameMode, decode_to_seed};
use anyhow::{Result, bail};

/// One resolved seed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    /// The token as supplied on the command line.
    pub token: String,
    pub seed: u64,
    /// Mode carried by an invite code, if the token was one.
    pub mode: Option<GameMode>,
}

impl SeedInfo {
    #[must_use]
    pub fn from_numeric(seed: u64) -> Self {
        Self {
            token: seed.to_string(),
            seed,
            mode: None,
        }
    }
}

/// Resolve seed tokens: decimal numbers, hex numbers (`0x` prefix), or
/// invite codes such as `ON-MOTIVE42`.
///
/// # Errors
///
/// Returns an error for a token that parses as none of the above.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut infos = Vec::with_capacity(tokens.len());
    for token in tokens {
        let trimmed = token.trim();
        if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            if let Ok(seed) = u64::from_str_radix(hex, 16) {
                infos.push(SeedInfo {
                    token: trimmed.to_string(),
                    seed,
                    mode: None,
                });
                continue;
            }
        }
        if let Ok(seed) = trimmed.parse::<u64>() {
            infos.push(SeedInfo::from_numeric(seed));
            continue;
        }
        if let Some((mode, seed)) = decode_to_seed(trimmed) {
            infos.push(SeedInfo {
                token: trimmed.to_string(),
                seed,
                mode: Some(mode),
            });
            continue;
        }
        bail!("unrecognized seed token: {trimmed}");
    }
    Ok(infos)
}
