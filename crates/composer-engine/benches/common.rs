// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use composer_engine::blocks::{ContentBlock, ops};

#[allow(dead_code)]
pub fn generate_blocks(count: usize) -> Vec<ContentBlock> {
    let mut blocks: Vec<ContentBlock> = (0..count)
        .map(|n| match n % 5 {
            0 => ContentBlock::heading(format!("Section {n}"), 2),
            1 => ContentBlock::list(vec!["One".into(), "Two".into(), "Three".into()], false),
            2 => ContentBlock::divider(),
            _ => ContentBlock::text(format!("Paragraph {n} with **some** inline markdown.")),
        })
        .collect();
    ops::renumber(&mut blocks);
    blocks
}

#[allow(dead_code)]
pub fn generate_copy(paragraphs: usize) -> String {
    let mut copy = String::new();
    for n in 0..paragraphs {
        if n % 6 == 0 {
            copy.push_str(&format!("## Heading {n}\n\n"));
        }
        copy.push_str("A paragraph of imported copy. It has a couple of sentences so splitting has real work to do.\n\n");
    }
    copy
}

#[allow(dead_code)]
pub fn generate_frontmatter_text(pairs: usize) -> String {
    let mut text = String::from("---\n");
    for n in 0..pairs {
        text.push_str(&format!("key{n}: value number {n}\n"));
    }
    text.push_str("---\n");
    text
}
