use pulldown_cmark::{Event, Options, Parser};

/// Converts markdown to plain text, optionally dropping blank lines afterwards.
pub fn convert(md: &str, remove_empty_lines: bool) -> String {
    let text = strip_markdown(md);

    if remove_empty_lines {
        drop_empty_lines(&text)
    } else {
        text
    }
}

/// Strips the markdown syntax from `md`, keeping only the readable text.
///
/// Every piece of text is written on the same line it occupied in the source, so
/// the blank lines separating blocks survive. Lines that held nothing but syntax
/// (code fences, setext underlines, rules, lone HTML tags) become empty lines.
pub fn strip_markdown(md: &str) -> String {
    let line_starts = line_starts(md);
    let parser = Parser::new_ext(md, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS);

    let mut out = Output::default();
    let mut in_tag = false;

    for (event, range) in parser.into_offset_iter() {
        let source_line = line_of(&line_starts, range.start);
        match event {
            Event::Text(content) => out.push(source_line, &content),
            Event::Code(content) => {
                out.push(source_line, &content);
                // Code spans fold their line breaks into spaces.
                let end_line = line_of(&line_starts, range.end.saturating_sub(1));
                out.line = out.line.max(end_line);
            }
            Event::Html(content) => {
                let stripped = strip_tags(&content, &mut in_tag);
                for (offset, piece) in stripped.split('\n').enumerate() {
                    let piece = piece.trim();
                    if !piece.is_empty() {
                        out.push(source_line + offset, piece);
                    }
                }
            }
            _ => {}
        }
    }

    let mut text = out.text;
    let trimmed = text.trim_end_matches('\n').len();
    text.truncate(trimmed);
    text
}

/// Text being assembled, and the source line its end sits on.
#[derive(Default)]
struct Output {
    text: String,
    line: usize,
}

impl Output {
    fn push(&mut self, source_line: usize, content: &str) {
        if self.text.is_empty() {
            self.line = source_line;
        } else if source_line > self.line {
            for _ in self.line..source_line {
                self.text.push('\n');
            }
            self.line = source_line;
        }

        self.text.push_str(content);
        self.line += content.matches('\n').count();
    }
}

/// Drops everything between `<` and `>` in an HTML fragment, keeping its line breaks.
///
/// `in_tag` carries an unfinished tag over to the next fragment.
fn strip_tags(html: &str, in_tag: &mut bool) -> String {
    let mut text = String::with_capacity(html.len());
    for c in html.chars() {
        match c {
            '\n' => text.push(c),
            '<' if !*in_tag => *in_tag = true,
            '>' if *in_tag => *in_tag = false,
            _ if *in_tag => {}
            _ => text.push(c),
        }
    }
    text
}

/// Removes every line that is empty or only whitespace.
pub fn drop_empty_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn line_starts(md: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(md.match_indices('\n').map(|(idx, _)| idx + 1))
        .collect()
}

fn line_of(line_starts: &[usize], offset: usize) -> usize {
    line_starts.partition_point(|&start| start <= offset) - 1
}
