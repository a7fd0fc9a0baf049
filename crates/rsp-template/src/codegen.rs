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

//! Rust source generation for pages and the backend entry point.

use crate::fragment::{Fragment, PageParts};
use std::fmt::Write;

/// Name of the handler function every generated page module exports.
pub const PAGE_FN: &str = "__process__";

/// Renders one page as a Rust module.
///
/// The handler sees the request as `request` and writes to `response`;
/// literals and evals become calls on `response` in fragment order.
pub fn render_page(parts: &PageParts, url: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// Generated by rsps from {}. Do not edit.", url);
    out.push_str(
        "#![allow(unused_imports, unused_variables, unused_mut, unused_braces, unreachable_code)]\n\n",
    );

    out.push_str("use rsp_runtime::prelude::*;\n");
    for import in &parts.imports {
        let import = import.trim();
        let import = import.strip_prefix("use ").unwrap_or(import);
        let import = import.strip_suffix(';').unwrap_or(import).trim();
        if !import.is_empty() {
            let _ = writeln!(out, "use {};", import);
        }
    }

    let _ = writeln!(out, "\npub const URL_PATH: &str = {:?};\n", url);
    let _ = writeln!(
        out,
        "pub fn {}(request: &PageRequest, response: &mut PageResponse) {{",
        PAGE_FN
    );
    for fragment in &parts.fragments {
        match fragment {
            Fragment::Literal(text) => {
                let _ = writeln!(out, "    response.print_str({:?});", text);
            }
            Fragment::Eval(expr) => {
                let _ = writeln!(out, "    response.print(&({}));", expr);
            }
            Fragment::Code(code) => {
                out.push_str(code);
                out.push('\n');
            }
        }
    }
    out.push_str("}\n");
    out
}

/// A routable page as seen by the entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPage {
    /// File stem under `src/pages/`
    pub symbol: String,
    /// URL path the page is registered under
    pub url: String,
}

/// Renders the backend `main.rs` registering every page.
///
/// Modules are named by position (`page_0`, `page_1`, ...), which keeps them
/// unique for the build regardless of what the symbols look like.
pub fn render_entry(pages: &[EntryPage]) -> String {
    let mut out = String::new();
    out.push_str("// Generated by rsps. Do not edit.\n\n");

    for (n, page) in pages.iter().enumerate() {
        let _ = writeln!(out, "#[path = {:?}]", format!("pages/{}.rs", page.symbol));
        let _ = writeln!(out, "mod page_{};", n);
    }

    out.push_str("\nstatic PAGES: &[(&str, rsp_runtime::PageHandler)] = &[\n");
    for (n, page) in pages.iter().enumerate() {
        let _ = writeln!(out, "    ({:?}, page_{}::{}),", page.url, n, PAGE_FN);
    }
    out.push_str("];\n\n");

    out.push_str("fn main() -> std::process::ExitCode {\n    rsp_runtime::run(PAGES)\n}\n");
    out
}
