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

use std::collections::{BTreeSet, HashSet};

/// One unit of a page body, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Text written to the response as-is
    Literal(String),
    /// Rust statements copied into the handler untouched
    Code(String),
    /// An expression whose `Display` output is written to the response
    Eval(String),
}

/// Everything collected from one top-level parse, includes already merged.
///
/// A fresh value is created per top-level parse. Included and required files
/// are merged into the same value, so the guard sets below live exactly as long
/// as the parse that owns them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageParts {
    pub fragments: Vec<Fragment>,
    /// Paths for generated `use` declarations
    pub imports: BTreeSet<String>,
    /// Every file merged through `include` or `require`
    pub depends: BTreeSet<String>,
    /// Set by a top-level `includeonly` directive
    pub include_only: bool,
    /// Files on the active include chain; an entry only lives while its own
    /// recursive parse runs
    pub(crate) including: HashSet<String>,
    /// Files already required during this parse; never shrinks
    pub(crate) required: HashSet<String>,
}

impl PageParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_literal(&mut self, text: String) {
        if !text.is_empty() {
            self.fragments.push(Fragment::Literal(text));
        }
    }

    pub(crate) fn push_code(&mut self, text: String) {
        self.fragments.push(Fragment::Code(text));
    }

    pub(crate) fn push_eval(&mut self, expr: &str) {
        self.fragments.push(Fragment::Eval(expr.trim().to_string()));
    }

    /// True when the page produced no fragments at all.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}
