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

//! RSP Template Compiler
//!
//! Turns one `.rsp` page into the Rust source of a single request handler.
//!
//! # Syntax
//!
//! A page is literal text interleaved with tags:
//!
//! | Tag              | Meaning                                              |
//! |------------------|------------------------------------------------------|
//! | `<% stmt %>`     | Rust statements, copied verbatim into the handler    |
//! | `<%= expr %>`    | Expression written to the response via `Display`     |
//! | `<%# text %>`    | Comment, dropped                                     |
//! | `<%!directive%>` | `import`, `include`, `require` or `includeonly`      |
//!
//! # Directives
//!
//! - `import "a::b", "c::d"` adds `use` declarations to the generated module
//! - `include "path"` merges another page in place; cycles along the active
//!   include chain are skipped, but the same file may be included again later
//! - `require "path"` merges another page at most once per top-level parse
//! - `includeonly` marks the top-level page as a fragment that is never routed
//!
//! # Example
//!
//! ```
//! use rsp_template::{Fragment, Parser};
//! use std::collections::HashMap;
//!
//! let parser = Parser::new(HashMap::<String, String>::new());
//! let parts = parser.parse("Hello <%= name %>!");
//! assert_eq!(parts.fragments, vec![
//!     Fragment::Literal("Hello ".into()),
//!     Fragment::Eval("name".into()),
//!     Fragment::Literal("!".into()),
//! ]);
//! ```

pub mod codegen;
pub mod fragment;
pub mod loader;
pub mod parser;
mod unquote;

#[cfg(test)]
mod tests;

pub use codegen::{render_entry, render_page, EntryPage, PAGE_FN};
pub use fragment::{Fragment, PageParts};
pub use loader::{DirLoader, SourceLoader};
pub use parser::Parser;
pub use unquote::{unquote, UnquoteError};
