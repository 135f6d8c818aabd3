//! Display-name formatting.

use crate::roles::{RoleId, RoleSet};
use serde::{Deserialize, Serialize};

/// Left bracket glyph around the level.
pub const OPEN_GLYPH: char = '❮';
/// Right bracket glyph around the level.
pub const CLOSE_GLYPH: char = '❯';

/// A role that swaps the level brackets for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRule {
    pub role: RoleId,
    pub symbol: String,
}

/// Pick the bracket replacement: rules are scanned in order and the last
/// matching rule wins.
pub fn bracket_symbol<'a>(symbols: &'a [SymbolRule], roles: &RoleSet) -> Option<&'a str> {
    symbols
        .iter()
        .rev()
        .find(|rule| roles.contains(&rule.role))
        .map(|rule| rule.symbol.as_str())
}

/// Build `❮{level}❯ {name} {suffix}`, swapping both glyphs for the
/// highest-priority symbol the member's roles match.
pub fn format_nickname(
    level: u32,
    name: &str,
    suffix: &str,
    symbols: &[SymbolRule],
    roles: &RoleSet,
) -> String {
    let nickname = format!("{OPEN_GLYPH}{level}{CLOSE_GLYPH} {name} {suffix}");
    match bracket_symbol(symbols, roles) {
        Some(symbol) => nickname
            .replace(OPEN_GLYPH, symbol)
            .replace(CLOSE_GLYPH, symbol),
        None => nickname,
    }
}

/// Recover the account name from a display name produced by
/// [`format_nickname`]: the second space-separated token with every
/// non-word character removed.
pub fn account_name_from_display(display: &str) -> Option<String> {
    let token = display.split(' ').nth(1)?;
    let name: String = token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    (!name.is_empty()).then_some(name)
}
