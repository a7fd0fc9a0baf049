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

//! Collision-free file names for generated page sources.
//!
//! A page's symbol is its path relative to the web root with every path
//! separator replaced by `_`. Distinct paths can map to the same candidate
//! (`a/b.rsp` and `a_b.rsp`), so candidates are handed out by a deferred
//! acceptance loop: when two paths want the same symbol the longer path wins,
//! then the lexicographically greater one, and the loser retries with `_`
//! appended. The result does not depend on the order paths are visited in.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};

/// Candidate symbol for `path` before collision handling.
pub fn base_symbol(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// URL path a page is registered under.
pub fn path_to_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    format!("/{}", path.trim_start_matches('/'))
}

/// Assigns every distinct path a unique symbol.
///
/// Returns symbol → path. The mapping is total over the input and injective.
pub fn allocate_symbols<I, P>(paths: I) -> BTreeMap<String, PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let distinct: BTreeSet<PathBuf> = paths
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .collect();

    let mut queue: VecDeque<(PathBuf, String)> = distinct
        .into_iter()
        .map(|p| {
            let sym = base_symbol(&p);
            (p, sym)
        })
        .collect();
    let mut owners: HashMap<String, PathBuf> = HashMap::new();

    while let Some((path, sym)) = queue.pop_front() {
        let Some(owner) = owners.get(&sym) else {
            owners.insert(sym, path);
            continue;
        };

        if outranks(&path, owner) {
            if let Some(loser) = owners.insert(sym.clone(), path) {
                queue.push_back((loser, format!("{}_", sym)));
            }
        } else {
            queue.push_back((path, format!("{}_", sym)));
        }
    }

    owners.into_iter().collect()
}

fn outranks(a: &Path, b: &Path) -> bool {
    let a = a.to_string_lossy();
    let b = b.to_string_lossy();
    (a.len(), a.as_ref()) > (b.len(), b.as_ref())
}
