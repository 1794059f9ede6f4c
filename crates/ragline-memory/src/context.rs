const DELIMITER: &str = "\n---\n";

/// Number the ranked texts from 1 and join them into one prompt block.
///
/// ```
/// let block = ragline_memory::assemble(&["first", "second"]);
/// assert_eq!(block, "<chunk> 1\nfirst\n---\n<chunk> 2\nsecond");
/// ```
#[must_use]
pub fn assemble<T: AsRef<str>>(ranked: &[T]) -> String {
    ranked
        .iter()
        .enumerate()
        .map(|(i, text)| format!("<chunk> {}\n{}", i + 1, text.as_ref()))
        .collect::<Vec<_>>()
        .join(DELIMITER)
}
