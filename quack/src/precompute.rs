//! Precomputed modular inverses of small integers, used by Newton's identity
//! (coefficient `i` of the power sum polynomial is divided by `i`).
//!
//! The table grows lazily: [`global_config_set_max_power_sum_threshold`] lets
//! a caller pay the precomputation cost once, up front, for the largest
//! threshold it expects to construct a quACK with.

use once_cell::sync::Lazy;
use std::sync::RwLock;

use crate::arithmetic::{ModularArithmetic, ModularInteger};

const DEFAULT_MAX_POWER_SUM_THRESHOLD: usize = 1024;

fn build_table(max: usize) -> Vec<ModularInteger> {
    let mut table = Vec::with_capacity(max + 1);
    table.push(ModularInteger::zero());
    for i in 1..=max {
        table.push(ModularInteger::new(i as u32).inverse());
    }
    table
}

static INVERSE_TABLE: Lazy<RwLock<Vec<ModularInteger>>> =
    Lazy::new(|| RwLock::new(build_table(DEFAULT_MAX_POWER_SUM_THRESHOLD)));

/// Grows the precomputed table of modular inverses so that a power sum quACK
/// with a threshold up to `threshold` can construct its Newton's-identity
/// polynomial without computing an inverse on the fly.
pub fn global_config_set_max_power_sum_threshold(threshold: usize) {
    let needs_growth = INVERSE_TABLE.read().unwrap().len() <= threshold;
    if needs_growth {
        let mut table = INVERSE_TABLE.write().unwrap();
        if table.len() <= threshold {
            *table = build_table(threshold);
        }
    }
}

/// The modular inverse of the small positive integer `i`.
pub(crate) fn inverse_of(i: usize) -> ModularInteger {
    {
        let table = INVERSE_TABLE.read().unwrap();
        if i < table.len() {
            return table[i];
        }
    }
    global_config_set_max_power_sum_threshold(i);
    INVERSE_TABLE.read().unwrap()[i]
}
