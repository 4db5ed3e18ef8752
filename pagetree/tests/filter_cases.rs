//! Data-driven filter tests using datatest-stable.
//!
//! Each test case is a file in `tests/filter-cases/` with format:
//! ```
//! <annotated markup>
//! ===
//! <expected dump after filter_all, or "(empty)">
//! ```

use pagetree::{filter_all, filter_semantic, filter_visible, parse_html};
use std::path::Path;

const EMPTY: &str = "(empty)";

fn run_filter_case(path: &Path) -> datatest_stable::Result<()> {
    facet_testhelpers::setup();

    let content = std::fs::read_to_string(path)?;
    let parts: Vec<&str> = content.split("\n===\n").collect();

    if parts.len() != 2 {
        return Err(format!(
            "Test file must have exactly one '===' separator, found {} parts",
            parts.len()
        )
        .into());
    }

    let markup = parts[0].trim();
    let expected = parts[1].trim();

    let doc = parse_html(markup);
    let filtered = filter_all(&doc);
    let result = filtered
        .as_ref()
        .map(|doc| doc.dump().to_string())
        .unwrap_or_else(|| EMPTY.to_string());

    if result.trim() != expected {
        return Err(format!(
            "Filter output mismatch!\nMarkup: {markup}\nParsed:\n{}\n\
             Result:\n{result}\nExpected:\n{expected}",
            doc.dump()
        )
        .into());
    }

    // composition law
    let composed = filter_visible(&doc).as_ref().and_then(filter_semantic);
    if composed != filtered {
        return Err("filter_all differs from filter_semantic(filter_visible(..))".into());
    }

    // a second pass changes nothing
    if let Some(once) = &filtered
        && filter_all(once).as_ref() != Some(once)
    {
        return Err("filter_all is not idempotent on this case".into());
    }

    Ok(())
}

datatest_stable::harness! {
    { test = run_filter_case, root = "tests/filter-cases", pattern = r".*\.html$" },
}
