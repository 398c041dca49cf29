//! Liquidity-sweep pattern classification
//!
//! A bar is labelled against its predecessor by an ordered rule table:
//!
//! 1. **Run / Bullish**: bullish after bullish, low swept, close above previous close
//! 2. **Run / Bearish**: bearish after bearish, high swept, close below previous close
//! 3. **Reversal / Bullish**: bullish after bearish, low swept, close above previous open
//! 4. **Reversal / Bearish**: bearish after bullish, high swept, close below previous open
//!
//! A matched bar is **plus** when its close also breaks the opposite extreme
//! of the previous bar.

pub mod helpers;
pub mod sweep;

pub use helpers::*;
pub use sweep::*;
