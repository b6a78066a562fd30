/// Wrap long code lines to `max_width` characters, keeping each line's
/// leading-space indentation on every continuation.
///
/// Cuts are raw character counts with no knowledge of tokens.
pub fn reflow(code: &str, max_width: usize) -> String {
    let mut out = String::with_capacity(code.len());

    for (i, line) in code.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        reflow_line(line, max_width, &mut out);
    }

    out
}

fn reflow_line(line: &str, max_width: usize, out: &mut String) {
    if line.chars().count() <= max_width {
        out.push_str(line);
        return;
    }

    let text = line.trim_start_matches(' ');
    let prefix = &line[..line.len() - text.len()];
    // Deep indentation still makes progress one character at a time.
    let width = max_width.saturating_sub(prefix.len()).max(1);

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width {
        out.push_str(line);
        return;
    }

    for (i, chunk) in chars.chunks(width).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(prefix);
        out.extend(chunk);
    }
}
