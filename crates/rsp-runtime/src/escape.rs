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

//! Escapers for values printed into different parts of a page.
//!
//! | Function      | Context                                            |
//! |---------------|----------------------------------------------------|
//! | [`html`]      | element text, keeps runs of spaces and line breaks |
//! | [`value`]     | attribute values, `<pre>`, `<textarea>`           |
//! | [`query`]     | a single query string component                    |
//! | [`js`]        | inside a quoted JavaScript string                  |
//! | [`markdown`]  | renders CommonMark to HTML                         |
//!
//! All of them accept anything that implements `Display`.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::{self, Write};

/// Escapes text for element content.
///
/// Besides the usual entities, a newline becomes `<br/>` and a space that
/// would otherwise collapse into its neighbour becomes `&nbsp;`.
pub fn html(text: impl fmt::Display) -> String {
    let text = text.to_string();
    let mut out = String::with_capacity(text.len());
    let mut last = '\0';

    for c in text.chars() {
        let entity = match c {
            '"' => "&#34;",
            '\'' => "&#39;",
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '\n' => "<br/>",
            ' ' if last > ' ' && last != '>' => {
                out.push(' ');
                last = ' ';
                continue;
            }
            ' ' => "&nbsp;",
            c => {
                out.push(c);
                last = c;
                continue;
            }
        };
        out.push_str(entity);
        last = entity.chars().last().unwrap_or('\0');
    }
    out
}

/// Escapes the five HTML special characters, leaving whitespace alone.
pub fn value(text: impl fmt::Display) -> String {
    let text = text.to_string();
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\0' => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    out
}

/// Bytes left as they are by [`query`]; spaces are handled separately.
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encodes a query component. Spaces become `+`.
pub fn query(text: impl fmt::Display) -> String {
    text.to_string()
        .split(' ')
        .map(|part| utf8_percent_encode(part, QUERY_SAFE).to_string())
        .collect::<Vec<_>>()
        .join("+")
}

/// Reverses [`query`]. Malformed escapes are kept as they are.
pub fn unquery(text: &str) -> String {
    percent_decode_str(&text.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Escapes text for use inside a single or double quoted JavaScript string.
pub fn js(text: impl fmt::Display) -> String {
    let text = text.to_string();
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            '=' => out.push_str("\\u003D"),
            c if c < ' ' => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c if c.is_ascii() => out.push(c),
            c if c.is_control() || c.is_whitespace() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Renders CommonMark to HTML. Raw HTML in the input is escaped.
pub fn markdown(text: impl fmt::Display) -> String {
    markdown::to_html(&text.to_string())
}
