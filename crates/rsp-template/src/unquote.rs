// Copyright 2025 RSP Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Quoted string arguments of directives.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnquoteError {
    #[error("not a quoted string: {0}")]
    NotQuoted(String),

    #[error("invalid escape sequence: \\{0}")]
    InvalidEscape(String),

    #[error("unescaped quote inside string")]
    StrayQuote,
}

/// Removes the quotes around a directive argument.
///
/// Accepts `"..."` with backslash escapes (`\\ \" \' \n \r \t \0 \xNN \u{N}`)
/// and raw `` `...` `` strings.
pub fn unquote(s: &str) -> Result<String, UnquoteError> {
    if s.len() >= 2 && s.starts_with('`') && s.ends_with('`') {
        let inner = &s[1..s.len() - 1];
        if inner.contains('`') {
            return Err(UnquoteError::StrayQuote);
        }
        return Ok(inner.to_string());
    }

    if s.len() < 2 || !s.starts_with('"') || !s.ends_with('"') {
        return Err(UnquoteError::NotQuoted(s.to_string()));
    }

    let inner = &s[1..s.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Err(UnquoteError::StrayQuote),
            '\\' => out.push(unescape(&mut chars)?),
            c => out.push(c),
        }
    }
    Ok(out)
}

fn unescape(chars: &mut std::str::Chars<'_>) -> Result<char, UnquoteError> {
    let c = chars
        .next()
        .ok_or_else(|| UnquoteError::InvalidEscape(String::new()))?;
    match c {
        '\\' => Ok('\\'),
        '"' => Ok('"'),
        '\'' => Ok('\''),
        'n' => Ok('\n'),
        'r' => Ok('\r'),
        't' => Ok('\t'),
        '0' => Ok('\0'),
        'x' => {
            let hex: String = chars.by_ref().take(2).collect();
            u8::from_str_radix(&hex, 16)
                .ok()
                .filter(|b| b.is_ascii() && hex.len() == 2)
                .map(char::from)
                .ok_or(UnquoteError::InvalidEscape(format!("x{}", hex)))
        }
        'u' => {
            if chars.next() != Some('{') {
                return Err(UnquoteError::InvalidEscape("u".to_string()));
            }
            let hex: String = chars.by_ref().take_while(|&c| c != '}').collect();
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or(UnquoteError::InvalidEscape(format!("u{{{}}}", hex)))
        }
        other => Err(UnquoteError::InvalidEscape(other.to_string())),
    }
}
