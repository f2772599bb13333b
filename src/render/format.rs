// src/render/format.rs — Message content to HTML
//
// Untrusted text is escaped first; every structural transform below runs on
// the escaped string. None of the delimiters (` $ \ * [ ( ) ]) are touched by
// escaping, so they can still be found afterwards. Math spans are left exactly
// as written (escaped) for a client-side math renderer.

/// Escape the five HTML-significant characters.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 8);
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape, then apply code fences, inline code, bold and line breaks.
pub fn format_content(raw: &str) -> String {
    let escaped = escape_html(raw);
    let segments = segments(&escaped);
    let bold = pair_bold(&segments);
    let mut out = String::with_capacity(escaped.len() + 32);
    for (idx, segment) in segments.into_iter().enumerate() {
        match segment {
            Segment::Text(t) => {
                let tags: Vec<(usize, &str)> = bold
                    .iter()
                    .filter(|(seg, _, _)| *seg == idx)
                    .map(|(_, at, tag)| (*at, *tag))
                    .collect();
                render_text(t, &tags, &mut out)
            }
            Segment::Fence { lang, body } => {
                if lang.is_empty() {
                    out.push_str("<pre><code>");
                } else {
                    out.push_str("<pre><code class=\"language-");
                    out.push_str(lang);
                    out.push_str("\">");
                }
                out.push_str(body);
                out.push_str("</code></pre>");
            }
            Segment::Code(body) => {
                out.push_str("<code>");
                out.push_str(body);
                out.push_str("</code>");
            }
            Segment::Math(span) => out.push_str(span),
        }
    }
    out
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Fence { lang: &'a str, body: &'a str },
    Code(&'a str),
    /// Includes its delimiters.
    Math(&'a str),
}

fn segments(s: &str) -> Vec<Segment<'_>> {
    let b = s.as_bytes();
    let mut out = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < b.len() {
        let rest = &b[i..];
        let found = if rest.starts_with(b"```") {
            fence(s, i)
        } else if rest.starts_with(b"$$") {
            math(s, i, "$$", "$$", true)
        } else if rest.starts_with(b"\\[") {
            math(s, i, "\\[", "\\]", true)
        } else if rest.starts_with(b"\\(") {
            math(s, i, "\\(", "\\)", false)
        } else if rest[0] == b'$' {
            dollar_math(s, i)
        } else if rest[0] == b'`' {
            inline_code(s, i)
        } else {
            None
        };

        let Some((segment, end)) = found else {
            i += 1;
            continue;
        };

        let is_fence = matches!(segment, Segment::Fence { .. });
        let mut text = &s[text_start..i];
        if is_fence {
            text = text.strip_suffix('\n').unwrap_or(text);
        }
        if !text.is_empty() {
            out.push(Segment::Text(text));
        }
        out.push(segment);

        i = end;
        if is_fence && b.get(i) == Some(&b'\n') {
            i += 1;
        }
        text_start = i;
    }

    if text_start < s.len() {
        out.push(Segment::Text(&s[text_start..]));
    }
    out
}

fn fence(s: &str, start: usize) -> Option<(Segment<'_>, usize)> {
    let inner_start = start + 3;
    let close = inner_start + s[inner_start..].find("```")?;
    let inner = &s[inner_start..close];

    let (lang, body) = match inner.split_once('\n') {
        Some((first, rest)) if is_lang_tag(first.trim()) => (first.trim(), rest),
        _ => ("", inner),
    };
    let body = body.strip_suffix('\n').unwrap_or(body);
    Some((Segment::Fence { lang, body }, close + 3))
}

fn is_lang_tag(tag: &str) -> bool {
    tag.len() <= 24
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '#' | '.'))
}

fn math<'a>(
    s: &'a str,
    start: usize,
    open: &str,
    close: &str,
    multiline: bool,
) -> Option<(Segment<'a>, usize)> {
    let body_start = start + open.len();
    let body_len = s[body_start..].find(close)?;
    let body = &s[body_start..body_start + body_len];
    if body.trim().is_empty() || (!multiline && body.contains('\n')) {
        return None;
    }
    let end = body_start + body_len + close.len();
    Some((Segment::Math(&s[start..end]), end))
}

/// `$...$`: the opener must touch its content, the closer must too and must
/// not run into a digit, so `$5 and $3` stays text.
fn dollar_math(s: &str, start: usize) -> Option<(Segment<'_>, usize)> {
    let b = s.as_bytes();
    let body_start = start + 1;
    if b.get(body_start).map_or(true, |c| c.is_ascii_whitespace() || *c == b'$') {
        return None;
    }
    let mut i = body_start + 1;
    while i < b.len() {
        match b[i] {
            b'\n' => return None,
            b'$' if !b[i - 1].is_ascii_whitespace()
                && !b.get(i + 1).is_some_and(|c| c.is_ascii_digit()) =>
            {
                return Some((Segment::Math(&s[start..=i]), i + 1));
            }
            _ => i += 1,
        }
    }
    None
}

fn inline_code(s: &str, start: usize) -> Option<(Segment<'_>, usize)> {
    let body_start = start + 1;
    let body_len = s[body_start..].find('`')?;
    let body = &s[body_start..body_start + body_len];
    if body.is_empty() || body.contains('\n') {
        return None;
    }
    Some((Segment::Code(body), body_start + body_len + 1))
}

/// Pair `**` markers across the inline segments between fences. Markers are
/// matched in order; an empty pair or an odd one out stops pairing for the
/// run and stays literal. Returns `(segment, byte offset, tag)`.
fn pair_bold(segments: &[Segment<'_>]) -> Vec<(usize, usize, &'static str)> {
    let mut tags = Vec::new();
    let mut run = Vec::new();
    for (idx, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Text(t) => {
                let mut from = 0;
                while let Some(at) = t[from..].find("**") {
                    run.push((idx, from + at));
                    from += at + 2;
                }
            }
            Segment::Fence { .. } => pair_run(&std::mem::take(&mut run), &mut tags),
            Segment::Code(_) | Segment::Math(_) => {}
        }
    }
    pair_run(&run, &mut tags);
    tags
}

fn pair_run(markers: &[(usize, usize)], tags: &mut Vec<(usize, usize, &'static str)>) {
    for pair in markers.chunks_exact(2) {
        let (open, close) = (pair[0], pair[1]);
        if open.0 == close.0 && close.1 == open.1 + 2 {
            break;
        }
        tags.push((open.0, open.1, "<strong>"));
        tags.push((close.0, close.1, "</strong>"));
    }
}

/// Text with its paired `**` markers (sorted offsets) swapped for tags, and
/// newlines as `<br>`.
fn render_text(text: &str, tags: &[(usize, &str)], out: &mut String) {
    let mut last = 0;
    for (at, tag) in tags {
        push_lines(&text[last..*at], out);
        out.push_str(tag);
        last = at + 2;
    }
    push_lines(&text[last..], out);
}

fn push_lines(text: &str, out: &mut String) {
    let mut lines = text.split('\n');
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push_str("<br>");
        out.push_str(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<img src=x onerror="a('b')"> & co"#),
            "&lt;img src=x onerror=&quot;a(&#39;b&#39;)&quot;&gt; &amp; co"
        );
    }

    #[test]
    fn test_script_injection_neutralised() {
        let html = format_content("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert_eq!(html, "&lt;script&gt;alert(1)&lt;/script&gt;");
    }

    #[test]
    fn test_fenced_block_with_math() {
        let raw = "Try this:\n```python\nif a < b and c & d:\n    print(\"x\")\n```\nThen $x<1$ and $$\\frac{a}{b}$$ done.";
        let html = format_content(raw);
        assert_eq!(
            html,
            "Try this:<pre><code class=\"language-python\">if a &lt; b and c &amp; d:\n    print(&quot;x&quot;)</code></pre>Then $x&lt;1$ and $$\\frac{a}{b}$$ done."
        );
    }

    #[test]
    fn test_fence_without_language() {
        assert_eq!(
            format_content("```\nlet x = 1;\n```"),
            "<pre><code>let x = 1;</code></pre>"
        );
    }

    #[test]
    fn test_fence_first_line_not_a_tag_is_kept() {
        assert_eq!(
            format_content("```x = 1 <- y\nz\n```"),
            "<pre><code>x = 1 &lt;- y\nz</code></pre>"
        );
    }

    #[test]
    fn test_unclosed_fence_is_literal() {
        assert_eq!(format_content("```rust\nfn"), "```rust<br>fn");
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(
            format_content("Use `Vec<u8>` here"),
            "Use <code>Vec&lt;u8&gt;</code> here"
        );
    }

    #[test]
    fn test_math_delimiters_untouched() {
        for raw in [
            "$a*b*c$",
            "$$\n**not bold**\n$$",
            "\\(x_1 + x_2\\)",
            "\\[\n\\sum_{i=1}^n i\n\\]",
        ] {
            assert_eq!(format_content(raw), raw, "{raw}");
        }
    }

    #[test]
    fn test_math_content_still_escaped() {
        assert_eq!(format_content("$a<b$"), "$a&lt;b$");
    }

    #[test]
    fn test_bold_and_newlines() {
        assert_eq!(
            format_content("**Learning Objectives:**\n- one\n- two"),
            "<strong>Learning Objectives:</strong><br>- one<br>- two"
        );
    }

    #[test]
    fn test_unpaired_bold_literal() {
        assert_eq!(format_content("2 ** 3"), "2 ** 3");
    }

    #[test]
    fn test_bold_around_math() {
        assert_eq!(
            format_content("**$x$ is key**"),
            "<strong>$x$ is key</strong>"
        );
        assert_eq!(
            format_content("**Use `lcm`** first"),
            "<strong>Use <code>lcm</code></strong> first"
        );
    }

    #[test]
    fn test_bold_does_not_cross_fence() {
        assert_eq!(
            format_content("a **b\n```\nx\n```\nc** d"),
            "a **b<pre><code>x</code></pre>c** d"
        );
    }

    #[test]
    fn test_currency_is_not_math() {
        assert_eq!(
            format_content("It costs $5, run `a<b` then pay $3"),
            "It costs $5, run <code>a&lt;b</code> then pay $3"
        );
        assert_eq!(format_content("$5 and $10"), "$5 and $10");
        assert_eq!(format_content("$2x + 1$ `y`"), "$2x + 1$ <code>y</code>");
    }

    #[test]
    fn test_multibyte_text_around_delimiters() {
        assert_eq!(
            format_content("Ngiyabonga 🎓 `π` é"),
            "Ngiyabonga 🎓 <code>π</code> é"
        );
    }

    #[test]
    fn test_format_is_deterministic() {
        let raw = "**x** `y` $z$\n```\nw\n```";
        assert_eq!(format_content(raw), format_content(raw));
    }
}
