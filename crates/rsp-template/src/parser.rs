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

//! Page scanner and directive handling.
//!
//! The scanner is a five-state machine over the characters of a page:
//!
//! ```text
//!              .-- Text <-------------.
//!          (<)/                        |
//!            V                         |(>)
//!         TagOpen                      |
//!         (%)|    ____(%)_____         |
//!            V   /            V        |
//!         TagType ---> TagBody ---> TagClose
//!            |   (=!#, other)    (%)
//!            `------(%)-----------^
//! ```
//!
//! `TagType` picks the tag kind from the first character after `<%`:
//! `=` eval, `!` directive, `#` comment, anything else local code.

use crate::fragment::PageParts;
use crate::loader::SourceLoader;
use crate::unquote::unquote;
use rsp_common::{Result, RspError};
use std::mem;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Local,
    Global,
    Eval,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Text,
    TagOpen,
    TagType,
    TagBody,
    TagClose,
}

/// Parses pages, resolving `include`/`require` targets through `L`.
pub struct Parser<L> {
    loader: L,
}

impl<L: SourceLoader> Parser<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Parses page source text.
    ///
    /// Never fails: unloadable includes and malformed directives are logged and
    /// skipped, and an unterminated tag at the end is dropped with a warning.
    pub fn parse(&self, src: &str) -> PageParts {
        let mut parts = PageParts::new();
        self.parse_into(src, &mut parts, 0);
        parts
    }

    /// Loads `path` through the loader and parses it as a top-level page.
    pub fn parse_file(&self, path: &str) -> Result<PageParts> {
        let src = self
            .loader
            .load(path)
            .map_err(|e| RspError::Template(format!("loading {}: {}", path, e)))?;
        Ok(self.parse(&src))
    }

    fn parse_into(&self, src: &str, parts: &mut PageParts, depth: usize) {
        use ScanState::*;

        let mut state = Text;
        let mut kind = TagKind::Global;
        let mut buf = String::new();

        for c in src.chars() {
            state = match (state, c) {
                (Text, '<') => TagOpen,
                (Text, c) => {
                    buf.push(c);
                    Text
                }
                (TagOpen, '%') => {
                    parts.push_literal(mem::take(&mut buf));
                    kind = TagKind::Global;
                    TagType
                }
                (TagOpen, c) => {
                    // not a tag after all
                    buf.push('<');
                    buf.push(c);
                    Text
                }
                (TagType, '=') => {
                    kind = TagKind::Eval;
                    TagBody
                }
                (TagType, '!') => {
                    kind = TagKind::Global;
                    TagBody
                }
                (TagType, '#') => {
                    kind = TagKind::Ignore;
                    TagBody
                }
                (TagType, '%') => TagClose,
                (TagType, c) => {
                    kind = TagKind::Local;
                    buf.push(c);
                    TagBody
                }
                (TagBody, '%') => TagClose,
                (TagBody, c) => {
                    buf.push(c);
                    TagBody
                }
                (TagClose, '>') => {
                    let body = mem::take(&mut buf);
                    self.add_tag(parts, body, kind, depth);
                    Text
                }
                (TagClose, c) => {
                    buf.push('%');
                    buf.push(c);
                    TagBody
                }
            };
        }

        match state {
            Text => parts.push_literal(buf),
            TagOpen => {
                buf.push('<');
                parts.push_literal(buf);
            }
            TagType | TagBody | TagClose => {
                warn!("Unclosed tag, discarding {} pending characters", buf.chars().count());
            }
        }
    }

    fn add_tag(&self, parts: &mut PageParts, body: String, kind: TagKind, depth: usize) {
        match kind {
            TagKind::Local => parts.push_code(body),
            TagKind::Eval => parts.push_eval(&body),
            TagKind::Ignore => {}
            TagKind::Global => self.add_directive(parts, &body, depth),
        }
    }

    fn add_directive(&self, parts: &mut PageParts, body: &str, depth: usize) {
        let (command, rest) = split_command(body);
        match command {
            "import" => {
                for item in rest.split(',') {
                    let item = item.trim();
                    match unquote(item) {
                        Ok(import) => {
                            parts.imports.insert(import);
                        }
                        Err(e) => warn!("import {} error: {}", item, e),
                    }
                }
            }
            "include" => {
                let Some(path) = directive_path("include", rest) else {
                    return;
                };
                if parts.including.contains(&path) {
                    debug!("Skipping cyclic include of {}", path);
                    return;
                }
                parts.including.insert(path.clone());
                if let Err(e) = self.merge(parts, &path, depth) {
                    warn!("include {} failed: {}", path, e);
                }
                parts.including.remove(&path);
            }
            "require" => {
                let Some(path) = directive_path("require", rest) else {
                    return;
                };
                if !parts.required.insert(path.clone()) {
                    debug!("{} already required", path);
                    return;
                }
                if let Err(e) = self.merge(parts, &path, depth) {
                    warn!("require {} failed: {}", path, e);
                }
            }
            "includeonly" => {
                if depth == 0 {
                    parts.include_only = true;
                } else {
                    debug!("Ignoring includeonly in an included page");
                }
            }
            other => debug!("Ignoring unknown directive {:?}", other),
        }
    }

    fn merge(&self, parts: &mut PageParts, path: &str, depth: usize) -> std::io::Result<()> {
        let src = self.loader.load(path)?;
        parts.depends.insert(path.to_string());
        self.parse_into(&src, parts, depth + 1);
        Ok(())
    }
}

/// Splits a directive body into its leading run of letters and the rest.
fn split_command(body: &str) -> (&str, &str) {
    let end = body
        .char_indices()
        .find(|(_, c)| !c.is_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    body.split_at(end)
}

fn directive_path(command: &str, rest: &str) -> Option<String> {
    let arg = rest.trim();
    match unquote(arg) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("{} {} error: {}", command, arg, e);
            None
        }
    }
}
