//! Reads annotated markup (or snapshot JSON with `--snapshot`) from stdin and
//! prints the tree before and after filtering.

use std::io::{self, Read};

use pagetree::{Document, SnapshotDecoder, filter_all, filter_visible, parse_html};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let doc: Document = if std::env::args().any(|arg| arg == "--snapshot") {
        SnapshotDecoder::new().decode_json(&input)?
    } else {
        parse_html(&input)
    };

    println!("=== parsed ({} nodes) ===", doc.node_count());
    print!("{}", doc.dump());

    for (title, filtered) in [
        ("filter_visible", filter_visible(&doc)),
        ("filter_all", filter_all(&doc)),
    ] {
        match filtered {
            Some(filtered) => {
                println!("=== {title} ({} nodes) ===", filtered.node_count());
                print!("{}", filtered.dump());
            }
            None => println!("=== {title}: nothing left ==="),
        }
    }
    Ok(())
}
