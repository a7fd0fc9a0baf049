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

use crate::codegen::{render_entry, render_page, EntryPage};
use crate::fragment::{Fragment, PageParts};
use crate::parser::Parser;
use std::collections::HashMap;

fn sources(files: &[(&str, &str)]) -> HashMap<String, String> {
    files
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn parse(files: &[(&str, &str)], src: &str) -> PageParts {
    Parser::new(sources(files)).parse(src)
}

fn lit(s: &str) -> Fragment {
    Fragment::Literal(s.to_string())
}

fn code(s: &str) -> Fragment {
    Fragment::Code(s.to_string())
}

fn eval(s: &str) -> Fragment {
    Fragment::Eval(s.to_string())
}

// ============================================================================
// Scanner
// ============================================================================

#[test]
fn test_plain_text_is_one_literal() {
    let src = "<html>\n  <body>100% plain & simple</body>\n</html>\n";
    let parts = parse(&[], src);
    assert_eq!(parts.fragments, vec![lit(src)]);
    assert!(!parts.include_only);
}

#[test]
fn test_empty_source() {
    let parts = parse(&[], "");
    assert!(parts.is_empty());
}

#[test]
fn test_local_code_keeps_inner_percent() {
    let parts = parse(&[], r#"<% "%v" %>"#);
    assert_eq!(parts.fragments, vec![code(r#" "%v" "#)]);
}

#[test]
fn test_ignore_tag_yields_nothing() {
    assert!(parse(&[], "<%# anything %>").is_empty());
    assert!(parse(&[], r#"<%# "%v" %>"#).is_empty());
}

#[test]
fn test_eval_is_trimmed() {
    let parts = parse(&[], "a<%=  1 + 2\n %>b");
    assert_eq!(parts.fragments, vec![lit("a"), eval("1 + 2"), lit("b")]);
}

#[test]
fn test_local_code_is_not_trimmed() {
    let parts = parse(&[], "<%\n  let x = 1;\n%><%=x%>");
    assert_eq!(parts.fragments, vec![code("\n  let x = 1;\n"), eval("x")]);
}

#[test]
fn test_immediately_closed_tag() {
    assert!(parse(&[], "<%%>").is_empty());
    assert_eq!(parse(&[], "a<%%>b").fragments, vec![lit("a"), lit("b")]);
}

#[test]
fn test_aborted_tag_is_literal() {
    assert_eq!(parse(&[], "a<b").fragments, vec![lit("a<b")]);
    assert_eq!(parse(&[], "1 < 2").fragments, vec![lit("1 < 2")]);
    // the second `<` aborts the first tag attempt and is consumed with it
    assert_eq!(parse(&[], "<<%x%>").fragments, vec![lit("<<%x%>")]);
}

#[test]
fn test_trailing_lt_is_kept() {
    assert_eq!(parse(&[], "abc<").fragments, vec![lit("abc<")]);
}

#[test]
fn test_percent_not_followed_by_gt() {
    let parts = parse(&[], "<% a % b %>");
    assert_eq!(parts.fragments, vec![code(" a % b ")]);
}

#[test]
fn test_unclosed_tag_is_discarded() {
    let parts = parse(&[], "before<% let x = 1;");
    assert_eq!(parts.fragments, vec![lit("before")]);

    let parts = parse(&[], "before<%= x %");
    assert_eq!(parts.fragments, vec![lit("before")]);

    let parts = parse(&[], "before<%");
    assert_eq!(parts.fragments, vec![lit("before")]);
}

#[test]
fn test_text_after_tag_that_looks_like_tag_tail() {
    let parts = parse(&[], r#"<%= "<" %>%!include "sub1"%>"#);
    assert_eq!(
        parts.fragments,
        vec![eval(r#""<""#), lit(r#"%!include "sub1"%>"#)]
    );
}

#[test]
fn test_unicode_text() {
    let parts = parse(&[], "héllo <%= wörld %> ✓");
    assert_eq!(parts.fragments, vec![lit("héllo "), eval("wörld"), lit(" ✓")]);
}

// ============================================================================
// Directives
// ============================================================================

#[test]
fn test_imports_are_collected_and_deduplicated() {
    let parts = parse(
        &[],
        r#"<%!import "std::fmt::Write", "std::collections::HashMap"%><%!import "std::fmt::Write"%>"#,
    );
    let imports: Vec<&str> = parts.imports.iter().map(String::as_str).collect();
    assert_eq!(imports, vec!["std::collections::HashMap", "std::fmt::Write"]);
    assert!(parts.is_empty());
}

#[test]
fn test_malformed_import_is_skipped() {
    let parts = parse(&[], r#"<%!import "ok::Path", not_quoted%>"#);
    assert_eq!(parts.imports.len(), 1);
    assert!(parts.imports.contains("ok::Path"));
}

#[test]
fn test_unknown_directive_is_ignored() {
    let parts = parse(&[], r#"x<%!frobnicate "a"%>y"#);
    assert_eq!(parts.fragments, vec![lit("x"), lit("y")]);
}

#[test]
fn test_include_merges_in_place() {
    let parts = parse(
        &[("header", "<h1><%= title %></h1>")],
        r#"<html><%!include "header"%></html>"#,
    );
    assert_eq!(
        parts.fragments,
        vec![lit("<html>"), lit("<h1>"), eval("title"), lit("</h1>"), lit("</html>")]
    );
    assert!(parts.depends.contains("header"));
}

#[test]
fn test_include_failure_is_local() {
    let parts = parse(&[], r#"a<%!include "missing"%>b"#);
    assert_eq!(parts.fragments, vec![lit("a"), lit("b")]);
    assert!(parts.depends.is_empty());
}

#[test]
fn test_included_imports_are_merged() {
    let parts = parse(
        &[("lib", r#"<%!import "std::fmt::Write"%>"#)],
        r#"<%!include "lib"%><%!import "std::io"%>"#,
    );
    assert_eq!(parts.imports.len(), 2);
}

#[test]
fn test_mutual_require_terminates_with_one_copy() {
    // A requires B then uses a symbol from B; B requires A.
    let files = [
        ("a", r#"<%!require "b"%><%= helper() %>"#),
        ("b", r#"<%!require "a"%><% fn helper() -> u32 { 7 } %>"#),
    ];
    let src = files[0].1;
    let parts = parse(&files, src);

    let b_code = code(" fn helper() -> u32 { 7 } ");
    let copies = parts.fragments.iter().filter(|f| **f == b_code).count();
    assert_eq!(copies, 1);
    assert_eq!(parts.fragments.last(), Some(&eval("helper()")));
}

#[test]
fn test_require_is_once_per_parse() {
    let files = [("funcs", "<% let play = || \"playing\"; %>")];
    let parts = parse(
        &files,
        r#"<%!require "funcs"%>x<%!require "funcs"%>y<%!require "funcs"%>"#,
    );
    assert_eq!(
        parts.fragments,
        vec![code(" let play = || \"playing\"; "), lit("x"), lit("y")]
    );
}

#[test]
fn test_require_guard_spans_nested_files() {
    let files = [
        ("header", r#"H<%!require "funcs"%>"#),
        ("footer", r#"F<%!require "funcs"%>"#),
        ("funcs", "<% helpers(); %>"),
    ];
    let parts = parse(&files, r#"<%!include "header"%><%!include "footer"%>"#);
    assert_eq!(
        parts.fragments,
        vec![lit("H"), code(" helpers(); "), lit("F")]
    );
}

#[test]
fn test_mutual_include_terminates() {
    let files = [("a", r#"A<%!include "b"%>"#), ("b", r#"B<%!include "a"%>"#)];
    let parts = parse(&files, files[0].1);
    // A(top) -> B -> A(nested) -> B is on the active chain and skipped
    assert_eq!(parts.fragments, vec![lit("A"), lit("B"), lit("A")]);
    let b_count = parts.fragments.iter().filter(|f| **f == lit("B")).count();
    assert_eq!(b_count, 1);
}

#[test]
fn test_include_guard_is_scoped_to_active_chain() {
    let files = [("b", "B")];
    let parts = parse(&files, r#"<%!include "b"%>-<%!include "b"%>"#);
    assert_eq!(parts.fragments, vec![lit("B"), lit("-"), lit("B")]);
}

#[test]
fn test_include_and_require_guards_differ() {
    let files = [("b", "B")];
    let included = parse(&files, r#"<%!include "b"%><%!include "b"%>"#);
    let required = parse(&files, r#"<%!require "b"%><%!require "b"%>"#);
    assert_eq!(included.fragments.len(), 2);
    assert_eq!(required.fragments.len(), 1);
}

#[test]
fn test_self_include_from_nested_chain() {
    let files = [("loop", r#"L<%!include "loop"%>"#)];
    let parts = parse(&files, r#"<%!include "loop"%>"#);
    assert_eq!(parts.fragments, vec![lit("L")]);
}

#[test]
fn test_includeonly_top_level() {
    let parts = parse(&[], "<%!includeonly%>");
    assert!(parts.include_only);
    assert!(parts.is_empty());
}

#[test]
fn test_includeonly_does_not_leak_from_included_file() {
    let files = [("file", "<%!includeonly%>")];
    let parts = parse(&files, r#"<%!include "file"%>"#);
    assert!(!parts.include_only);

    let parts = parse(&files, r#"<%!require "file"%>"#);
    assert!(!parts.include_only);
}

#[test]
fn test_includeonly_page_with_content() {
    let parts = parse(&[], "<%!includeonly%><nav>menu</nav>");
    assert!(parts.include_only);
    assert_eq!(parts.fragments, vec![lit("<nav>menu</nav>")]);
}

#[test]
fn test_header_footer_scenario() {
    let files = [
        (
            "header",
            r#"== This is the header == requiring "funcs" in header <%!require "funcs" %><%= play() %> The following include will be ignored: <%= "<" %>%!include "sub1"%>"#,
        ),
        (
            "footer",
            r#"requiring "funcs" in footer <%!require "funcs" %><%= play() %> === footer ==="#,
        ),
        ("funcs", r#"<% let play = || "playing\n"; %>"#),
    ];
    let src = r#"<%!include "header"%> abc<%!import "std::fmt::Write", "std::collections::HashMap"%>" <%!require "header"%>"#;
    let parts = parse(&files, src);

    assert_eq!(
        parts.fragments,
        vec![
            lit(r#"== This is the header == requiring "funcs" in header "#),
            code(r#" let play = || "playing\n"; "#),
            eval("play()"),
            lit(" The following include will be ignored: "),
            eval(r#""<""#),
            lit(r#"%!include "sub1"%>"#),
            lit(" abc"),
            lit(r#"" "#),
            lit(r#"== This is the header == requiring "funcs" in header "#),
            eval("play()"),
            lit(" The following include will be ignored: "),
            eval(r#""<""#),
            lit(r#"%!include "sub1"%>"#),
        ]
    );
    assert_eq!(parts.imports.len(), 2);
    let depends: Vec<&str> = parts.depends.iter().map(String::as_str).collect();
    assert_eq!(depends, vec!["funcs", "header"]);
    assert!(!parts.include_only);
}

#[test]
fn test_parse_file_missing_top_level() {
    let parser = Parser::new(sources(&[]));
    assert!(parser.parse_file("index.rsp").is_err());
}

#[test]
fn test_parse_file() {
    let parser = Parser::new(sources(&[("index.rsp", "hi")]));
    assert_eq!(parser.parse_file("index.rsp").unwrap().fragments, vec![lit("hi")]);
}

// ============================================================================
// Code generation
// ============================================================================

#[test]
fn test_render_page() {
    let parts = parse(
        &[],
        "<%!import \"std::fmt::Write\"%><p><% let n = 3; %><%= n * 2 %>\"q\"</p>",
    );
    let src = render_page(&parts, "/dir/page.rsp");

    assert!(src.contains("use rsp_runtime::prelude::*;\n"));
    assert!(src.contains("use std::fmt::Write;\n"));
    assert!(src.contains("pub const URL_PATH: &str = \"/dir/page.rsp\";"));
    assert!(src.contains(
        "pub fn __process__(request: &PageRequest, response: &mut PageResponse) {"
    ));

    let p = src.find("response.print_str(\"<p>\");").unwrap();
    let c = src.find(" let n = 3; \n").unwrap();
    let e = src.find("response.print(&(n * 2));").unwrap();
    let q = src.find(r#"response.print_str("\"q\"</p>");"#).unwrap();
    assert!(p < c && c < e && e < q);
    assert!(src.ends_with("}\n"));
}

#[test]
fn test_render_page_escapes_literals() {
    let parts = parse(&[], "line1\nline2\t\\end");
    let src = render_page(&parts, "/a.rsp");
    assert!(src.contains(r#"response.print_str("line1\nline2\t\\end");"#));
}

#[test]
fn test_render_page_normalizes_import_forms() {
    let mut parts = PageParts::new();
    parts.imports.insert("use std::io::Write;".to_string());
    parts.imports.insert("  ".to_string());
    let src = render_page(&parts, "/a.rsp");
    assert!(src.contains("use std::io::Write;\n"));
    assert!(!src.contains("use use"));
    assert!(!src.contains("use ;"));
}

#[test]
fn test_render_entry() {
    let pages = vec![
        EntryPage {
            symbol: "index.rsp".to_string(),
            url: "/index.rsp".to_string(),
        },
        EntryPage {
            symbol: "blog_post.rsp".to_string(),
            url: "/blog/post.rsp".to_string(),
        },
    ];
    let src = render_entry(&pages);

    assert!(src.contains("#[path = \"pages/index.rsp.rs\"]\nmod page_0;"));
    assert!(src.contains("#[path = \"pages/blog_post.rsp.rs\"]\nmod page_1;"));
    assert!(src.contains("(\"/index.rsp\", page_0::__process__),"));
    assert!(src.contains("(\"/blog/post.rsp\", page_1::__process__),"));
    assert!(src.contains("rsp_runtime::run(PAGES)"));
}

#[test]
fn test_render_entry_without_pages() {
    let src = render_entry(&[]);
    assert!(src.contains("static PAGES: &[(&str, rsp_runtime::PageHandler)] = &[\n];"));
}
